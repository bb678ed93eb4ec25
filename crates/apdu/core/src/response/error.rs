//! Error types specific to APDU responses

use super::status::StatusWord;

/// A response whose status word reports failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Status error {status} ({})", .status.description())]
pub struct StatusError {
    /// Status word that caused the error
    pub status: StatusWord,
}

impl StatusError {
    /// Create a new status error
    pub const fn new(status: StatusWord) -> Self {
        Self { status }
    }
}

/// Error for APDU response processing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResponseError {
    /// Response shorter than a status word
    #[error("Incomplete response: {0} bytes")]
    Incomplete(usize),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(&'static str),

    /// Status error
    #[error(transparent)]
    Status(#[from] StatusError),
}

impl ResponseError {
    /// Create a parse error with a message
    pub const fn parse(message: &'static str) -> Self {
        Self::Parse(message)
    }

    /// Get the status word if this is a status error
    pub const fn status_word(&self) -> Option<StatusWord> {
        match self {
            Self::Status(e) => Some(e.status),
            _ => None,
        }
    }
}
