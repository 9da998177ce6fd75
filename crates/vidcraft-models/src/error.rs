//! Model error types.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{kind} {id} is already {status} and cannot change")]
    TerminalState {
        kind: &'static str,
        id: String,
        status: String,
    },

    #[error("Invalid timeline: {0}")]
    InvalidTimeline(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    pub fn terminal(kind: &'static str, id: impl Into<String>, status: impl Into<String>) -> Self {
        Self::TerminalState {
            kind,
            id: id.into(),
            status: status.into(),
        }
    }

    pub fn invalid_timeline(msg: impl Into<String>) -> Self {
        Self::InvalidTimeline(msg.into())
    }
}
