//! Thumbnail grid projection
//!
//! A [`ThumbnailView`] is what the presentation layer draws for one page: it
//! mirrors model flags and gesture state but owns none of them. Rebuild the
//! views with [`project`] after every workspace change.

use crate::reorder::ReorderEngine;
use page_model::{Mode, PageIndex, PageModel};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailView {
    pub page: PageIndex,
    /// 0-based display position.
    pub position: usize,
    pub image: PathBuf,
    pub label: String,
    pub deleted: bool,
    pub selected: bool,
    pub pending_move: bool,
    pub dragging: bool,
    pub rotation_degrees: u16,
    /// The 'X' control is only shown in organize mode.
    pub delete_control_visible: bool,
}

pub fn project(model: &PageModel, mode: Mode, reorder: &ReorderEngine) -> Vec<ThumbnailView> {
    let order = match reorder.provisional_order() {
        Some(order) => order.to_vec(),
        None => model.current_order(),
    };
    let dragged = reorder.drag().map(|session| session.dragged());

    order
        .into_iter()
        .enumerate()
        .filter_map(|(position, page)| {
            let entry = model.entry(page)?;
            Some(ThumbnailView {
                page,
                position,
                image: entry.image().to_path_buf(),
                label: page.to_string(),
                deleted: entry.is_deleted(),
                selected: entry.is_selected(),
                pending_move: reorder.pending_move() == Some(page),
                dragging: dragged == Some(page),
                rotation_degrees: entry.rotation().degrees(),
                delete_control_visible: mode == Mode::Organize,
            })
        })
        .collect()
}

/// Grid geometry for the thumbnail area
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailLayout {
    /// Thumbnail width in pixels
    pub thumbnail_width: f32,

    /// Thumbnail height in pixels
    pub thumbnail_height: f32,

    /// Spacing between thumbnails in pixels
    pub spacing: f32,

    /// Thumbnails per row
    pub columns: usize,
}

impl Default for ThumbnailLayout {
    fn default() -> Self {
        Self { thumbnail_width: 120.0, thumbnail_height: 160.0, spacing: 8.0, columns: 4 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A pointer position resolved to a thumbnail slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotHit {
    pub position: usize,
    /// Horizontal offset across the thumbnail, 0.0 at the left edge and 1.0 at the right.
    pub fraction: f32,
}

impl ThumbnailLayout {
    fn columns(&self) -> usize {
        self.columns.max(1)
    }

    fn pitch(&self) -> (f32, f32) {
        (self.thumbnail_width + self.spacing, self.thumbnail_height + self.spacing)
    }

    pub fn slot_rect(&self, position: usize) -> SlotRect {
        let (pitch_x, pitch_y) = self.pitch();
        let column = position % self.columns();
        let row = position / self.columns();

        SlotRect {
            x: self.spacing + column as f32 * pitch_x,
            y: self.spacing + row as f32 * pitch_y,
            width: self.thumbnail_width,
            height: self.thumbnail_height,
        }
    }

    /// Resolves a point in content coordinates. Points in the gaps between
    /// thumbnails, or past the last page, hit nothing.
    pub fn hit_test(&self, x: f32, y: f32, count: usize) -> Option<SlotHit> {
        if x < self.spacing || y < self.spacing {
            return None;
        }

        let (pitch_x, pitch_y) = self.pitch();
        let column = ((x - self.spacing) / pitch_x).floor() as usize;
        let row = ((y - self.spacing) / pitch_y).floor() as usize;

        if column >= self.columns() {
            return None;
        }

        let position = row * self.columns() + column;
        if position >= count {
            return None;
        }

        let rect = self.slot_rect(position);
        if x > rect.x + rect.width || y > rect.y + rect.height {
            return None;
        }

        Some(SlotHit { position, fraction: (x - rect.x) / rect.width })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reorder::DropSide;

    fn model(pages: u32) -> PageModel {
        PageModel::from_images((0..pages).map(|i| PathBuf::from(format!("/tmp/preview_{i}.png"))))
            .expect("model should load")
    }

    #[test]
    fn projection_mirrors_model_flags() {
        let mut model = model(3);
        model.toggle_deleted(PageIndex(2)).expect("page exists");
        model.apply_rotation(PageIndex(3), 90).expect("valid rotation");

        let views = project(&model, Mode::Organize, &ReorderEngine::new());

        assert_eq!(views.len(), 3);
        assert!(views[1].deleted);
        assert_eq!(views[2].rotation_degrees, 90);
        assert_eq!(views[0].label, "1");
        assert_eq!(views[0].image, PathBuf::from("/tmp/preview_0.png"));
        assert!(views.iter().all(|view| view.delete_control_visible));
    }

    #[test]
    fn delete_control_hidden_outside_organize() {
        let model = model(2);

        let views = project(&model, Mode::Split, &ReorderEngine::new());
        assert!(views.iter().all(|view| !view.delete_control_visible));
    }

    #[test]
    fn projection_follows_provisional_drag_order() {
        let mut model = model(3);
        let mut engine = ReorderEngine::new();
        engine.begin_drag(&model, PageIndex(1)).expect("page exists");
        engine.drag_over(PageIndex(3), DropSide::After);

        let views = project(&model, Mode::Organize, &engine);
        let order: Vec<u32> = views.iter().map(|view| view.page.get()).collect();
        assert_eq!(order, vec![2, 3, 1]);
        assert!(views[2].dragging);
        assert_eq!(views[2].position, 2);

        engine.click(&mut model, PageIndex(2)).expect("page exists");
        let views = project(&model, Mode::Organize, &engine);
        assert!(views.iter().any(|view| view.pending_move && view.page == PageIndex(2)));
    }

    #[test]
    fn slot_rect_wraps_rows() {
        let layout = ThumbnailLayout::default();

        let first = layout.slot_rect(0);
        assert_eq!((first.x, first.y), (8.0, 8.0));

        let fifth = layout.slot_rect(4);
        assert_eq!((fifth.x, fifth.y), (8.0, 176.0));
    }

    #[test]
    fn hit_test_reports_slot_and_fraction() {
        let layout = ThumbnailLayout::default();

        let hit = layout.hit_test(8.0 + 90.0, 20.0, 3).expect("point is on the first thumbnail");
        assert_eq!(hit.position, 0);
        assert!((hit.fraction - 0.75).abs() < 0.001);

        let hit = layout.hit_test(136.0 + 10.0, 20.0, 3).expect("point is on the second thumbnail");
        assert_eq!(hit.position, 1);
    }

    #[test]
    fn hit_test_misses_gaps_and_empty_slots() {
        let layout = ThumbnailLayout::default();

        assert!(layout.hit_test(4.0, 20.0, 3).is_none());
        assert!(layout.hit_test(131.0, 20.0, 3).is_none());
        assert!(layout.hit_test(8.0 + 3.0 * 128.0 + 5.0, 20.0, 3).is_none());
        assert!(layout.hit_test(20.0, 180.0, 3).is_none());
    }
}
