//! Error types specific to card transport

/// Transport error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection error
    #[error("Failed to connect to reader {0}")]
    Connection(String),

    /// No card present on the reader
    #[error("No card present in reader {0}")]
    NoCard(String),

    /// Transmission error
    #[error("Failed to transmit data")]
    Transmission,

    /// The card was removed or reset during the session
    #[error("Card was removed or reset")]
    CardLost,

    /// Device error
    #[error("Device error")]
    Device,

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Cancelled operation
    #[error("Operation cancelled")]
    Cancelled,

    /// Other error with message
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Create a general other error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other(message.into())
    }
}
