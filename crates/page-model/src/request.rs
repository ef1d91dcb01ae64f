use crate::{Mode, PageIndex, Rotation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One reconciled save operation, ready for the transformation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum TransformRequest {
    /// `page_order` still lists deleted pages; the engine drops `delete_pages` by original index.
    #[serde(rename_all = "camelCase")]
    Organize { page_order: Vec<PageIndex>, delete_pages: Vec<PageIndex> },
    Split { pages: Vec<PageIndex> },
    Rotate { rotations: BTreeMap<PageIndex, Rotation> },
}

impl TransformRequest {
    pub fn mode(&self) -> Mode {
        match self {
            Self::Organize { .. } => Mode::Organize,
            Self::Split { .. } => Mode::Split,
            Self::Rotate { .. } => Mode::Rotate,
        }
    }
}

/// Comma-joined page numbers, the form the per-operation scripts take on argv.
pub fn join_indexes(pages: &[PageIndex]) -> String {
    pages.iter().map(PageIndex::to_string).collect::<Vec<_>>().join(",")
}
