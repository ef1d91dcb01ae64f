//! Page organization workspace
//!
//! Holds one loaded document as an ordered list of page thumbnails, routes user
//! gestures according to the active mode, and reconciles the edits into a single
//! transformation request on save.

pub mod commit;
pub mod error;
pub mod mode;
pub mod reorder;
pub mod services;
pub mod thumbnail;
pub mod workspace;

pub use commit::reconcile;
pub use error::WorkspaceError;
pub use mode::{Gesture, ModeController};
pub use page_model::{Mode, PageEntry, PageIndex, PageModel, PageModelError, Rotation, TransformRequest};
pub use reorder::{move_relative, ClickOutcome, DragSession, DropSide, ReorderEngine};
pub use services::{
    DocumentHandle, PreviewPages, PreviewReply, PreviewRequest, PreviewService, ServiceError,
    TransformEngine, TransformOutcome, TransformReply,
};
pub use thumbnail::{project, SlotHit, SlotRect, ThumbnailLayout, ThumbnailView};
pub use workspace::{PageClick, Workspace, WorkspaceEvent, WorkspaceState};
