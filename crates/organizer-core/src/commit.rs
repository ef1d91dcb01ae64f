//! Save reconciliation
//!
//! Folds the page model and the active mode into exactly one
//! [`TransformRequest`]. Validation happens here, before any external call.

use crate::error::WorkspaceError;
use page_model::{Mode, PageModel, TransformRequest};

pub fn reconcile(model: &PageModel, mode: Mode) -> Result<TransformRequest, WorkspaceError> {
    if model.is_empty() {
        return Err(WorkspaceError::NoDocument);
    }

    match mode {
        // Deleted pages stay in the order; the engine drops them by original index.
        Mode::Organize => Ok(TransformRequest::Organize {
            page_order: model.current_order(),
            delete_pages: model.deleted_indexes().into_iter().collect(),
        }),
        Mode::Split => {
            let pages: Vec<_> = model.selected_indexes().into_iter().collect();
            if pages.is_empty() {
                return Err(WorkspaceError::NoSelection);
            }
            Ok(TransformRequest::Split { pages })
        }
        Mode::Rotate => {
            let rotations = model.rotation_map();
            if rotations.is_empty() {
                return Err(WorkspaceError::NoRotationApplied);
            }
            Ok(TransformRequest::Rotate { rotations })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_model::PageIndex;
    use std::path::PathBuf;

    fn model(pages: u32) -> PageModel {
        PageModel::from_images((0..pages).map(|i| PathBuf::from(format!("p{i}.png"))))
            .expect("model should load")
    }

    fn pages(indexes: &[u32]) -> Vec<PageIndex> {
        indexes.iter().copied().map(PageIndex).collect()
    }

    #[test]
    fn organize_keeps_deleted_pages_in_order() {
        let mut model = model(5);
        model.reorder(&pages(&[3, 1, 2, 5, 4])).expect("permutation");
        model.toggle_deleted(PageIndex(2)).expect("page exists");

        assert_eq!(
            reconcile(&model, Mode::Organize),
            Ok(TransformRequest::Organize {
                page_order: pages(&[3, 1, 2, 5, 4]),
                delete_pages: pages(&[2]),
            })
        );
    }

    #[test]
    fn split_lists_selection_ascending() {
        let mut model = model(4);
        model.reorder(&pages(&[4, 3, 2, 1])).expect("permutation");
        model.toggle_selected(PageIndex(4)).expect("page exists");
        model.toggle_selected(PageIndex(1)).expect("page exists");

        assert_eq!(
            reconcile(&model, Mode::Split),
            Ok(TransformRequest::Split { pages: pages(&[1, 4]) })
        );
    }

    #[test]
    fn split_without_selection_fails() {
        assert_eq!(reconcile(&model(3), Mode::Split), Err(WorkspaceError::NoSelection));
    }

    #[test]
    fn rotate_without_rotation_fails() {
        let mut model = model(2);
        model.apply_rotation(PageIndex(1), 180).expect("valid rotation");
        model.apply_rotation(PageIndex(1), 180).expect("valid rotation");

        assert_eq!(reconcile(&model, Mode::Rotate), Err(WorkspaceError::NoRotationApplied));
    }

    #[test]
    fn empty_model_has_nothing_to_commit() {
        assert_eq!(reconcile(&PageModel::new(), Mode::Organize), Err(WorkspaceError::NoDocument));
    }
}
