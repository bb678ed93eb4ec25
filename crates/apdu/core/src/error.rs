//! Error type for a complete command/response exchange

use crate::response::ResponseError;
use crate::transport::TransportError;

/// Result type for APDU exchanges
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while exchanging a command with a card
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The command never reached the card, or its answer never came back
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The card answered with something that is not a valid response APDU
    #[error(transparent)]
    Response(#[from] ResponseError),
}

impl Error {
    /// Check if this error came from the transport rather than the card
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
