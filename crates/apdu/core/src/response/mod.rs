//! APDU response parsing
//!
//! Every response carries a trailing two byte status word. Readers that proxy native
//! tag commands put the tag's own reply (for example the PN533 `D5 43` frame) in the
//! payload in front of it.

mod error;
pub mod status;

use bytes::Bytes;
use tracing::trace;

pub use error::{ResponseError, StatusError};
use status::StatusWord;

/// Basic APDU response structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Response payload data, empty when the card only returned a status word
    payload: Bytes,
    /// Status word
    status: StatusWord,
}

impl Response {
    /// Create a new response with payload and status
    pub fn new(payload: impl Into<Bytes>, status: impl Into<StatusWord>) -> Self {
        Self {
            payload: payload.into(),
            status: status.into(),
        }
    }

    /// Parse response from raw bytes (including status word)
    pub fn from_bytes(data: &[u8]) -> Result<Self, ResponseError> {
        let Some((&sw2, rest)) = data.split_last() else {
            return Err(ResponseError::Incomplete(data.len()));
        };
        let Some((&sw1, payload)) = rest.split_last() else {
            return Err(ResponseError::Incomplete(data.len()));
        };
        let status = StatusWord::new(sw1, sw2);

        trace!(
            sw1 = format_args!("{:#04x}", status.sw1),
            sw2 = format_args!("{:#04x}", status.sw2),
            payload_len = payload.len(),
            "Parsed APDU response"
        );

        Ok(Self {
            payload: Bytes::copy_from_slice(payload),
            status,
        })
    }

    /// Get the response payload data
    pub const fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Get the status word
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// Check if the response indicates success (90 00)
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Consume the response, returning the payload on success or the status as an error
    pub fn into_payload(self) -> Result<Bytes, StatusError> {
        if self.is_success() {
            Ok(self.payload)
        } else {
            Err(StatusError::new(self.status))
        }
    }
}

impl TryFrom<&[u8]> for Response {
    type Error = ResponseError;

    fn try_from(data: &[u8]) -> Result<Self, ResponseError> {
        Self::from_bytes(data)
    }
}
