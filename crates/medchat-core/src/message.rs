//! UI-agnostic chat state types
//!
//! This module contains the data structures shared between the controller and
//! any front end rendering it. Nothing here depends on a UI framework.

use serde::{Deserialize, Serialize};

/// A chat message in the conversation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: Option<String>,
    pub file_path: Option<String>,
    pub audio_path: Option<String>,
    /// Error notices are assistant messages styled differently by the view
    #[serde(default)]
    pub is_error: bool,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatMessage {
    pub fn user(text: Option<String>, file_path: Option<String>, audio_path: Option<String>) -> Self {
        Self {
            role: ChatRole::User,
            text,
            file_path,
            audio_path,
            is_error: false,
        }
    }

    pub fn assistant(text: impl Into<String>, audio_path: Option<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: Some(text.into()),
            file_path: None,
            audio_path,
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: Some(text.into()),
            file_path: None,
            audio_path: None,
            is_error: true,
        }
    }

    /// How the attached file (if any) should be displayed
    pub fn attachment_kind(&self) -> AttachmentKind {
        self.file_path
            .as_deref()
            .map(AttachmentKind::from_path)
            .unwrap_or(AttachmentKind::None)
    }
}

/// Display class of an attached file, decided by its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Pdf,
    None,
}

impl AttachmentKind {
    pub fn from_path(path: &str) -> Self {
        // Extensions are matched case-sensitively, as uploaded paths are lowercase
        if [".png", ".jpg", ".jpeg", ".gif"].iter().any(|ext| path.ends_with(ext)) {
            AttachmentKind::Image
        } else if path.ends_with(".pdf") {
            AttachmentKind::Pdf
        } else {
            AttachmentKind::None
        }
    }
}

/// Last path segment, used as the label for PDF links
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// A file known to the server: the pending attachment slot and the
/// recent-files list both hold these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub filename: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
}

impl FileRef {
    pub fn new(filename: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            file_path: file_path.into(),
        }
    }
}
