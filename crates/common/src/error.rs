//! Error types shared across Repsense crates.

use std::path::PathBuf;

/// Top-level error type for Repsense operations.
#[derive(Debug, thiserror::Error)]
pub enum RepsenseError {
    /// A required input (file, frame, session id) was not supplied.
    #[error("Missing input: {message}")]
    InputMissing { message: String },

    /// Input was supplied but could not be decoded or opened.
    #[error("Unreadable input: {message}")]
    InputUnreadable { message: String },

    /// Input was decodable but semantically invalid (e.g. a negative weight).
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Classifier error: {message}")]
    Classifier { message: String },

    #[error("Pose estimation error: {message}")]
    Pose { message: String },

    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    /// An output artifact or external process could not be allocated.
    #[error("Resource error: {message}")]
    Resource { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using RepsenseError.
pub type RepsenseResult<T> = Result<T, RepsenseError>;

impl RepsenseError {
    pub fn input_missing(msg: impl Into<String>) -> Self {
        Self::InputMissing {
            message: msg.into(),
        }
    }

    pub fn input_unreadable(msg: impl Into<String>) -> Self {
        Self::InputUnreadable {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier {
            message: msg.into(),
        }
    }

    pub fn pose(msg: impl Into<String>) -> Self {
        Self::Pose {
            message: msg.into(),
        }
    }

    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound {
            session_id: session_id.into(),
        }
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether the error was caused by the caller rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InputMissing { .. }
                | Self::InputUnreadable { .. }
                | Self::InvalidInput { .. }
                | Self::SessionNotFound { .. }
        )
    }
}
