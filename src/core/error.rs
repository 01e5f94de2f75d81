//! Client Failure Type
//!
//! Every way a backend call can go wrong collapses into `ClientError`.
//! Callers that only need to show something to the user use its
//! `Display`; callers that care whether the request reached the backend
//! use `kind()`.

use std::time::Duration;
use thiserror::Error;

/// Whether the request completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The request could not complete (connect, timeout, unreadable reply).
    Transport,
    /// The backend answered and said no.
    Application,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("backend returned HTTP {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("{0}")]
    Application(String),

    #[error("malformed response: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ClientError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ClientError::Timeout(_)
            | ClientError::Transport(_)
            | ClientError::UnexpectedStatus { .. } => FailureKind::Transport,
            ClientError::InvalidInput(_)
            | ClientError::Application(_)
            | ClientError::Decode(_) => FailureKind::Application,
        }
    }

    pub(crate) fn from_reqwest(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            ClientError::Timeout(timeout)
        } else {
            ClientError::Transport(error)
        }
    }
}
