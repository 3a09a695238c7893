//! Error types shared across the crate

use thiserror::Error;

/// Errors raised by timer transitions
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimerError {
    #[error("cannot {action} while {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: &'static str,
    },
    #[error("duration must be at least one minute, got {0}")]
    InvalidDuration(u64),
}

/// Errors raised by the snapshot stores and the session recorder
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} from remote store: {message}")]
    Status { status: u16, message: String },
    #[error("remote document for {0} is not an object")]
    NotAnObject(String),
    #[error("failed to lock {0}")]
    Poisoned(&'static str),
}
