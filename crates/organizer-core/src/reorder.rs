//! Page reordering gestures
//!
//! Two protocols share one engine:
//!
//! - Click-to-move: the first click arms a source page, a click on another page
//!   moves the source immediately before it, a second click on the source cancels.
//! - Drag: every pointer update over a neighbouring thumbnail relocates the
//!   dragged page right away in a provisional order; releasing the drag writes
//!   that order into the [`PageModel`].
//!
//! Reordering only permutes entries, so deletion flags and rotations stay with
//! their original page.

use page_model::{PageIndex, PageModel, PageModelError};

/// Result of a click in organize mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Armed(PageIndex),
    Moved { source: PageIndex, destination: PageIndex },
    Cancelled(PageIndex),
}

/// Which side of the target a dragged page lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropSide {
    Before,
    After,
}

impl DropSide {
    /// `fraction` is the pointer's offset across the target, 0.0 at its leading edge.
    /// Past the midpoint the page goes after the target.
    pub fn from_fraction(fraction: f32) -> Self {
        if fraction > 0.5 {
            Self::After
        } else {
            Self::Before
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    dragged: PageIndex,
    order: Vec<PageIndex>,
    origin: Vec<PageIndex>,
}

impl DragSession {
    pub fn dragged(&self) -> PageIndex {
        self.dragged
    }

    pub fn order(&self) -> &[PageIndex] {
        &self.order
    }

    pub fn has_moved(&self) -> bool {
        self.order != self.origin
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReorderEngine {
    pending_move: Option<PageIndex>,
    drag: Option<DragSession>,
}

impl ReorderEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_move(&self) -> Option<PageIndex> {
        self.pending_move
    }

    pub fn drag(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    /// Order to display while a drag is in flight.
    pub fn provisional_order(&self) -> Option<&[PageIndex]> {
        self.drag.as_ref().map(DragSession::order)
    }

    /// Drops any pending move and in-flight drag without touching the model.
    pub fn abandon(&mut self) {
        self.pending_move = None;
        self.drag = None;
    }

    pub fn click(
        &mut self,
        model: &mut PageModel,
        page: PageIndex,
    ) -> Result<ClickOutcome, PageModelError> {
        if !model.contains(page) {
            return Err(PageModelError::UnknownPage(page));
        }

        match self.pending_move.take() {
            None => {
                self.pending_move = Some(page);
                Ok(ClickOutcome::Armed(page))
            }
            Some(source) if source == page => Ok(ClickOutcome::Cancelled(page)),
            Some(source) => {
                let order = move_relative(&model.current_order(), source, page, DropSide::Before);
                model.reorder(&order)?;
                Ok(ClickOutcome::Moved { source, destination: page })
            }
        }
    }

    pub fn begin_drag(&mut self, model: &PageModel, page: PageIndex) -> Result<(), PageModelError> {
        if !model.contains(page) {
            return Err(PageModelError::UnknownPage(page));
        }

        let order = model.current_order();
        self.drag = Some(DragSession { dragged: page, origin: order.clone(), order });
        Ok(())
    }

    /// Relocates the dragged page next to `target`. Returns whether the provisional order changed.
    pub fn drag_over(&mut self, target: PageIndex, side: DropSide) -> bool {
        let Some(session) = self.drag.as_mut() else {
            return false;
        };

        if target == session.dragged || !session.order.contains(&target) {
            return false;
        }

        let order = move_relative(&session.order, session.dragged, target, side);
        if order == session.order {
            return false;
        }

        session.order = order;
        true
    }

    /// Ends the drag and commits its order. Returns whether the model order changed.
    pub fn end_drag(&mut self, model: &mut PageModel) -> Result<bool, PageModelError> {
        let Some(session) = self.drag.take() else {
            return Ok(false);
        };

        if !session.has_moved() {
            return Ok(false);
        }

        model.reorder(&session.order)?;
        Ok(true)
    }
}

/// Moves `source` next to `target` and keeps every other relative position.
/// Returns the order unchanged if either page is missing or they are the same page.
pub fn move_relative(
    order: &[PageIndex],
    source: PageIndex,
    target: PageIndex,
    side: DropSide,
) -> Vec<PageIndex> {
    if source == target || !order.contains(&source) || !order.contains(&target) {
        return order.to_vec();
    }

    let mut moved: Vec<PageIndex> = order.iter().copied().filter(|page| *page != source).collect();
    let Some(target_position) = moved.iter().position(|page| *page == target) else {
        return order.to_vec();
    };

    let insert_at = match side {
        DropSide::Before => target_position,
        DropSide::After => target_position + 1,
    };
    moved.insert(insert_at, source);
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn model(pages: u32) -> PageModel {
        PageModel::from_images((0..pages).map(|i| PathBuf::from(format!("p{i}.png"))))
            .expect("model should load")
    }

    fn pages(indexes: &[u32]) -> Vec<PageIndex> {
        indexes.iter().copied().map(PageIndex).collect()
    }

    #[test]
    fn move_relative_inserts_before_or_after_target() {
        let order = pages(&[1, 2, 3, 4, 5]);

        assert_eq!(move_relative(&order, PageIndex(4), PageIndex(1), DropSide::Before), pages(&[4, 1, 2, 3, 5]));
        assert_eq!(move_relative(&order, PageIndex(1), PageIndex(3), DropSide::After), pages(&[2, 3, 1, 4, 5]));
        assert_eq!(move_relative(&order, PageIndex(1), PageIndex(3), DropSide::Before), pages(&[2, 1, 3, 4, 5]));
        assert_eq!(move_relative(&order, PageIndex(2), PageIndex(2), DropSide::After), order);
        assert_eq!(move_relative(&order, PageIndex(9), PageIndex(2), DropSide::After), order);
    }

    #[test]
    fn click_to_move_places_source_before_destination() {
        let mut model = model(5);
        let mut engine = ReorderEngine::new();

        assert_eq!(engine.click(&mut model, PageIndex(4)), Ok(ClickOutcome::Armed(PageIndex(4))));
        assert_eq!(engine.pending_move(), Some(PageIndex(4)));

        assert_eq!(
            engine.click(&mut model, PageIndex(1)),
            Ok(ClickOutcome::Moved { source: PageIndex(4), destination: PageIndex(1) })
        );
        assert_eq!(model.current_order(), pages(&[4, 1, 2, 3, 5]));
        assert_eq!(engine.pending_move(), None);
    }

    #[test]
    fn second_click_on_source_cancels() {
        let mut model = model(3);
        let mut engine = ReorderEngine::new();

        engine.click(&mut model, PageIndex(2)).expect("page exists");
        assert_eq!(engine.click(&mut model, PageIndex(2)), Ok(ClickOutcome::Cancelled(PageIndex(2))));
        assert_eq!(engine.pending_move(), None);
        assert_eq!(model.current_order(), pages(&[1, 2, 3]));
    }

    #[test]
    fn click_on_unknown_page_keeps_pending_move() {
        let mut model = model(3);
        let mut engine = ReorderEngine::new();

        engine.click(&mut model, PageIndex(2)).expect("page exists");
        assert_eq!(engine.click(&mut model, PageIndex(7)), Err(PageModelError::UnknownPage(PageIndex(7))));
        assert_eq!(engine.pending_move(), Some(PageIndex(2)));
    }

    #[test]
    fn drag_relocates_immediately_and_commits_on_release() {
        let mut model = model(4);
        let mut engine = ReorderEngine::new();
        engine.begin_drag(&model, PageIndex(1)).expect("page exists");

        assert!(engine.drag_over(PageIndex(2), DropSide::from_fraction(0.7)));
        assert_eq!(engine.provisional_order(), Some(pages(&[2, 1, 3, 4]).as_slice()));
        assert!(engine.drag_over(PageIndex(3), DropSide::from_fraction(0.9)));
        assert_eq!(engine.provisional_order(), Some(pages(&[2, 3, 1, 4]).as_slice()));
        assert_eq!(model.current_order(), pages(&[1, 2, 3, 4]));

        assert_eq!(engine.end_drag(&mut model), Ok(true));
        assert_eq!(model.current_order(), pages(&[2, 3, 1, 4]));
        assert!(engine.drag().is_none());
    }

    #[test]
    fn drag_toward_start_inserts_before_target() {
        let mut model = model(4);
        let mut engine = ReorderEngine::new();
        engine.begin_drag(&model, PageIndex(4)).expect("page exists");

        assert!(engine.drag_over(PageIndex(2), DropSide::from_fraction(0.3)));
        engine.end_drag(&mut model).expect("order is a permutation");
        assert_eq!(model.current_order(), pages(&[1, 4, 2, 3]));
    }

    #[test]
    fn drag_over_self_or_same_slot_is_ignored() {
        let model = model(3);
        let mut engine = ReorderEngine::new();
        engine.begin_drag(&model, PageIndex(2)).expect("page exists");

        assert!(!engine.drag_over(PageIndex(2), DropSide::After));
        assert!(!engine.drag_over(PageIndex(3), DropSide::Before));
        assert!(!engine.drag_over(PageIndex(1), DropSide::After));
    }

    #[test]
    fn drag_returned_to_origin_leaves_model_untouched() {
        let mut model = model(3);
        let mut engine = ReorderEngine::new();
        engine.begin_drag(&model, PageIndex(1)).expect("page exists");

        engine.drag_over(PageIndex(3), DropSide::After);
        engine.drag_over(PageIndex(2), DropSide::Before);
        assert_eq!(engine.end_drag(&mut model), Ok(false));
        assert_eq!(model.current_order(), pages(&[1, 2, 3]));
    }

    #[test]
    fn abandon_discards_pending_move_and_drag() {
        let mut model = model(3);
        let mut engine = ReorderEngine::new();
        engine.click(&mut model, PageIndex(1)).expect("page exists");
        engine.begin_drag(&model, PageIndex(3)).expect("page exists");
        engine.drag_over(PageIndex(1), DropSide::Before);

        engine.abandon();

        assert_eq!(engine.pending_move(), None);
        assert_eq!(engine.provisional_order(), None);
        assert_eq!(engine.end_drag(&mut model), Ok(false));
        assert_eq!(model.current_order(), pages(&[1, 2, 3]));
    }

    #[test]
    fn moves_keep_flags_with_their_page() {
        let mut model = model(4);
        model.toggle_deleted(PageIndex(3)).expect("page exists");
        model.apply_rotation(PageIndex(1), 180).expect("valid rotation");
        let mut engine = ReorderEngine::new();

        engine.click(&mut model, PageIndex(3)).expect("page exists");
        engine.click(&mut model, PageIndex(1)).expect("page exists");

        assert_eq!(model.current_order(), pages(&[3, 1, 2, 4]));
        assert!(model.entry(PageIndex(3)).is_some_and(|entry| entry.is_deleted()));
        assert!(model.entry(PageIndex(1)).is_some_and(|entry| entry.rotation().degrees() == 180));
    }
}
