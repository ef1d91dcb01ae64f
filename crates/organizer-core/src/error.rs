use crate::mode::Gesture;
use crate::services::ServiceError;
use page_model::{Mode, PageModelError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Model(#[from] PageModelError),
    #[error("no document is loaded")]
    NoDocument,
    #[error("{gesture} is not available in {mode} mode")]
    GestureNotAllowed { gesture: Gesture, mode: Mode },
    #[error("No pages selected. Select at least one page to extract.")]
    NoSelection,
    #[error("No pages were rotated. Apply a rotation first.")]
    NoRotationApplied,
    #[error(transparent)]
    ExternalServiceFailure(#[from] ServiceError),
}

impl WorkspaceError {
    /// `false` for UI/model desyncs that are logged and refused rather than shown.
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            Self::Model(PageModelError::UnknownPage(_) | PageModelError::InvalidRotation(_))
                | Self::GestureNotAllowed { .. }
        )
    }
}
