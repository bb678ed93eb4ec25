use tapkit_apdu_core::{ResponseError, StatusWord, TransportError};
use tapkit_ndef::NdefError;

use crate::types::CardType;

/// Result type for card operations
pub type Result<T> = std::result::Result<T, Error>;

/// Broad category of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The reader or the session failed
    Transport,
    /// The card answered, but not with success
    Protocol,
    /// A key or password was rejected
    Authentication,
    /// The request was refused before anything was sent
    Validation,
    /// The detected card cannot do what was asked
    Unsupported,
}

/// Error type for card operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reader or session failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Malformed response APDU
    #[error(transparent)]
    Response(#[from] ResponseError),

    /// The card answered a command with a failure status
    #[error("{operation} failed: status {status} ({})", .status.description())]
    Status {
        /// What was attempted
        operation: &'static str,
        /// Status word returned
        status: StatusWord,
    },

    /// The tag reported an error inside a communicate-thru reply
    #[error("{operation} failed at page {page}: card error {code:02X}")]
    CardError {
        /// What was attempted
        operation: &'static str,
        /// Page addressed
        page: u8,
        /// Status byte of the `D5 43` frame
        code: u8,
    },

    /// Every method of a fallback ladder failed
    #[error("{operation} failed for {unit} {address}: no supported method worked")]
    NoMethodWorked {
        /// What was attempted
        operation: &'static str,
        /// Page or block
        unit: &'static str,
        /// Address of the unit
        address: u8,
    },

    /// No key opened the sector
    #[error("authentication failed for sector {sector}")]
    SectorAuthentication {
        /// Sector number
        sector: u8,
    },

    /// PWD_AUTH was rejected
    #[error("password authentication failed: wrong password or unsupported card")]
    PasswordAuthentication,

    /// Argument of the wrong length
    #[error("{field} must be exactly {expected} bytes, got {actual}")]
    InvalidLength {
        /// Argument name
        field: &'static str,
        /// Required length
        expected: usize,
        /// Supplied length
        actual: usize,
    },

    /// User writes never touch the UID, lock and CC pages
    #[error("cannot write to system page {0} (use page 4 or higher for user data)")]
    SystemPage(u8),

    /// Plain block access refused on a sector trailer
    #[error("block {0} is a sector trailer")]
    SectorTrailerBlock(u8),

    /// Trailer access requested on a data block
    #[error("block {0} is not a sector trailer")]
    NotSectorTrailer(u8),

    /// NDEF data larger than the tag's user area
    #[error("{size} bytes of NDEF data do not fit the {capacity} byte user area of {card_type}")]
    CapacityExceeded {
        /// Encoded size
        size: usize,
        /// Room on the tag
        capacity: usize,
        /// Detected family
        card_type: CardType,
    },

    /// Malformed input
    #[error("invalid {field}: {reason}")]
    InvalidInput {
        /// Input name
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// NDEF data could not be encoded
    #[error(transparent)]
    Ndef(#[from] NdefError),

    /// Operation not available for the detected family
    #[error("{operation} is not supported on {card_type}")]
    Unsupported {
        /// What was attempted
        operation: &'static str,
        /// Detected family
        card_type: CardType,
    },

    /// Key derivation needs a 4-byte UID
    #[error("UID must be 4 bytes for key derivation, got {0}")]
    UidLength(usize),
}

impl Error {
    /// Category of this error
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::Response(_)
            | Self::Status { .. }
            | Self::CardError { .. }
            | Self::NoMethodWorked { .. } => ErrorKind::Protocol,
            Self::SectorAuthentication { .. } | Self::PasswordAuthentication => {
                ErrorKind::Authentication
            }
            Self::InvalidLength { .. }
            | Self::SystemPage(_)
            | Self::SectorTrailerBlock(_)
            | Self::NotSectorTrailer(_)
            | Self::CapacityExceeded { .. }
            | Self::InvalidInput { .. }
            | Self::Ndef(_) => ErrorKind::Validation,
            Self::Unsupported { .. } | Self::UidLength(_) => ErrorKind::Unsupported,
        }
    }

    /// Status word the card answered with, if the error carries one
    pub const fn status(&self) -> Option<StatusWord> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn invalid_length(field: &'static str, expected: usize, actual: usize) -> Self {
        Self::InvalidLength {
            field,
            expected,
            actual,
        }
    }
}

impl From<tapkit_apdu_core::Error> for Error {
    fn from(error: tapkit_apdu_core::Error) -> Self {
        match error {
            tapkit_apdu_core::Error::Transport(e) => Self::Transport(e),
            tapkit_apdu_core::Error::Response(e) => Self::Response(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::from(TransportError::CardLost).kind(), ErrorKind::Transport);
        assert_eq!(
            Error::Status {
                operation: "read",
                status: StatusWord::new(0x63, 0x00),
            }
            .kind(),
            ErrorKind::Protocol
        );
        assert_eq!(
            Error::SectorAuthentication { sector: 1 }.kind(),
            ErrorKind::Authentication
        );
        assert_eq!(Error::SystemPage(2).kind(), ErrorKind::Validation);
        assert_eq!(
            Error::Unsupported {
                operation: "lock",
                card_type: CardType::MifareClassic,
            }
            .kind(),
            ErrorKind::Unsupported
        );
    }

    #[test]
    fn test_status_message() {
        let error = Error::Status {
            operation: "read block 4",
            status: StatusWord::new(0x63, 0x00),
        };
        assert_eq!(
            error.to_string(),
            "read block 4 failed: status 63 00 (Operation failed)"
        );
        assert_eq!(error.status(), Some(StatusWord::new(0x63, 0x00)));
    }
}
