//! Error types for PC/SC transport

use tapkit_apdu_core::TransportError;

/// PC/SC-specific errors
#[derive(Debug, thiserror::Error)]
pub enum PcscError {
    /// PC/SC error
    #[error("PC/SC error: {0}")]
    Pcsc(#[from] pcsc::Error),

    /// No readers available
    #[error("No readers available")]
    NoReadersAvailable,

    /// Reader not found
    #[error("Reader not found: {0}")]
    ReaderNotFound(String),

    /// No card present in reader
    #[error("No card present in reader: {0}")]
    NoCard(String),

    /// Unrecognised share mode name
    #[error("Invalid share mode: {0} (expected shared, exclusive or direct)")]
    InvalidShareMode(String),
}

impl From<PcscError> for TransportError {
    fn from(error: PcscError) -> Self {
        match error {
            PcscError::ReaderNotFound(reader) => Self::Connection(reader),
            PcscError::NoCard(reader) => Self::NoCard(reader),
            PcscError::Pcsc(pcsc::Error::ResetCard | pcsc::Error::RemovedCard) => Self::CardLost,
            PcscError::Pcsc(pcsc::Error::Timeout) => Self::Timeout,
            PcscError::Pcsc(pcsc::Error::Cancelled) => Self::Cancelled,
            other => Self::Other(other.to_string()),
        }
    }
}
