use reqwest::StatusCode;
use thiserror::Error;

/// Failures surfaced by the remote client and the sync cycle.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The request could not complete (connect, TLS, timeout, body read).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("remote error ({status}): {message}")]
    Remote { status: StatusCode, message: String },

    /// The payload does not match the documented wire shape.
    #[error("decode error: {0}")]
    Decode(String),
}

impl SyncError {
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;
