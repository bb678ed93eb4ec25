use thiserror::Error;

/// Result type for NDEF encoding and decoding
pub type Result<T> = std::result::Result<T, NdefError>;

/// Errors raised by the NDEF codec
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NdefError {
    /// The buffer ended in the middle of a record
    #[error("record truncated at offset {offset}: need {needed} more bytes")]
    Truncated {
        /// Offset of the record header
        offset: usize,
        /// Bytes missing
        needed: usize,
    },

    /// Chunked records are not reassembled
    #[error("chunked record at offset {0} is not supported")]
    ChunkedRecord(usize),

    /// Record type longer than the one byte type length can express
    #[error("record type is {0} bytes, at most 255 allowed")]
    TypeTooLong(usize),

    /// Message longer than the three byte TLV length can express
    #[error("message is {0} bytes, at most 65535 fit in a TLV")]
    MessageTooLarge(usize),

    /// The message contains no records where at least one is required
    #[error("message has no records")]
    EmptyMessage,
}
