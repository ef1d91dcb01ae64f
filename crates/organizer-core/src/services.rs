//! Contracts with the external collaborators
//!
//! The workspace never reads PDF bytes itself. Thumbnails come from a
//! [`PreviewService`] and the final save goes to a [`TransformEngine`]. Both
//! answer with the `{ success, message, ... }` replies the per-operation
//! scripts print, which [`PreviewReply`] and [`TransformReply`] model.

use page_model::{PageIndex, TransformRequest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Opaque reference to the loaded document, passed through to the collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentHandle(PathBuf);

impl DocumentHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// File name shown in the workspace header.
    pub fn display_name(&self) -> String {
        self.0
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.0.display().to_string())
    }
}

impl fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewRequest {
    AllPages,
    Page(PageIndex),
}

impl PreviewRequest {
    /// Page argument on the wire: `-1` for all pages, otherwise the 0-based page.
    pub fn wire_index(self) -> i64 {
        match self {
            Self::AllPages => -1,
            Self::Page(page) => i64::from(page.zero_based()),
        }
    }
}

/// Rendered preview images; `file_paths[i]` belongs to page `i + 1` for an all-pages request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewPages {
    pub file_paths: Vec<PathBuf>,
    pub page_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutcome {
    pub message: String,
    pub output_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The collaborator ran and answered `success: false`.
    #[error("{0}")]
    Rejected(String),
    /// The collaborator could not be reached or its answer could not be read.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ServiceError {
    pub fn message(&self) -> &str {
        match self {
            Self::Rejected(message) | Self::Transport(message) => message,
        }
    }
}

pub trait PreviewService {
    fn render(
        &mut self,
        document: &DocumentHandle,
        request: PreviewRequest,
    ) -> Result<PreviewPages, ServiceError>;
}

pub trait TransformEngine {
    fn invoke(
        &mut self,
        document: &DocumentHandle,
        request: &TransformRequest,
        destination: &Path,
    ) -> Result<TransformOutcome, ServiceError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_paths: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    #[serde(default)]
    pub page_count: u32,
}

impl PreviewReply {
    pub fn into_result(self) -> Result<PreviewPages, ServiceError> {
        if !self.success {
            return Err(ServiceError::Rejected(
                self.message.unwrap_or_else(|| "preview failed".to_owned()),
            ));
        }

        let mut file_paths = self.file_paths;
        if file_paths.is_empty() {
            file_paths.extend(self.file_path);
        }

        Ok(PreviewPages { file_paths, page_count: self.page_count })
    }
}

impl From<PreviewPages> for PreviewReply {
    fn from(pages: PreviewPages) -> Self {
        Self {
            success: true,
            message: None,
            file_paths: pages.file_paths,
            file_path: None,
            page_count: pages.page_count,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformReply {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
}

impl TransformReply {
    pub fn into_result(self) -> Result<TransformOutcome, ServiceError> {
        if !self.success {
            let message = if self.message.is_empty() {
                "transformation failed".to_owned()
            } else {
                self.message
            };
            return Err(ServiceError::Rejected(message));
        }

        Ok(TransformOutcome { message: self.message, output_path: self.output_path })
    }
}

impl From<TransformOutcome> for TransformReply {
    fn from(outcome: TransformOutcome) -> Self {
        Self { success: true, message: outcome.message, output_path: outcome.output_path }
    }
}
