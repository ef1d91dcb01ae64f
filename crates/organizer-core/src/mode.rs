//! Interaction modes
//!
//! Exactly one of organize, split or rotate is active. The mode decides which
//! gestures are live and when the commit button is enabled.

use crate::error::WorkspaceError;
use page_model::{Mode, PageModel};
use std::fmt;

/// User gestures routed by the active mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    ToggleDelete,
    ClickToMove,
    Drag,
    ToggleSelect,
    Rotate,
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ToggleDelete => "delete toggle",
            Self::ClickToMove => "click-to-move",
            Self::Drag => "drag reorder",
            Self::ToggleSelect => "page selection",
            Self::Rotate => "rotation",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeController {
    mode: Mode,
}

impl ModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Sets the mode and returns the previous one. Callers clear the transient
    /// per-mode state (selection, pending move) on every switch.
    pub fn switch(&mut self, mode: Mode) -> Mode {
        std::mem::replace(&mut self.mode, mode)
    }

    pub fn allows(&self, gesture: Gesture) -> bool {
        matches!(
            (self.mode, gesture),
            (Mode::Organize, Gesture::ToggleDelete | Gesture::ClickToMove | Gesture::Drag)
                | (Mode::Split, Gesture::ToggleSelect)
                | (Mode::Rotate, Gesture::ToggleSelect | Gesture::Rotate)
        )
    }

    pub fn require(&self, gesture: Gesture) -> Result<(), WorkspaceError> {
        if self.allows(gesture) {
            Ok(())
        } else {
            Err(WorkspaceError::GestureNotAllowed { gesture, mode: self.mode })
        }
    }

    /// Split needs a selection; organize and rotate only need a loaded document.
    /// Rotate still fails at commit time when nothing was rotated.
    pub fn commit_enabled(&self, model: &PageModel) -> bool {
        if model.is_empty() {
            return false;
        }

        match self.mode {
            Mode::Organize | Mode::Rotate => true,
            Mode::Split => !model.selected_indexes().is_empty(),
        }
    }

    pub fn hint(&self, model: &PageModel, move_pending: bool) -> String {
        match self.mode {
            Mode::Organize if move_pending => "Now click the destination to move the page.".to_owned(),
            Mode::Split => match model.selected_indexes().len() {
                0 => self.mode.hint().to_owned(),
                count => format!("{count} page(s) selected for extraction."),
            },
            mode => mode.hint().to_owned(),
        }
    }
}
