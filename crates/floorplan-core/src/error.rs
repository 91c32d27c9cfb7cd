//! Editor errors and user-facing notifications.

use crate::backend::BackendError;
use crate::layers::LayerError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Not authorized")]
    Unauthorized,
    #[error("Network error: {0}")]
    Network(String),
}

pub type EditorResult<T> = Result<T, EditorError>;

impl From<BackendError> for EditorError {
    fn from(error: BackendError) -> Self {
        match error {
            BackendError::NotFound(what) => EditorError::NotFound(what),
            BackendError::Unauthorized => EditorError::Unauthorized,
            BackendError::Validation(msg) => EditorError::Validation(msg),
            BackendError::Network(msg) | BackendError::Other(msg) => EditorError::Network(msg),
        }
    }
}

impl From<LayerError> for EditorError {
    fn from(error: LayerError) -> Self {
        EditorError::Validation(error.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// A message for the user, queued on the session until drained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

impl From<&EditorError> for Notification {
    fn from(error: &EditorError) -> Self {
        match error {
            EditorError::Validation(_) | EditorError::NotFound(_) => Notification::warning(error.to_string()),
            EditorError::Unauthorized | EditorError::Network(_) => Notification::error(error.to_string()),
        }
    }
}
