//! Transport traits for APDU communication with cards
//!
//! A [`CardConnector`] opens a session to a named reader; the resulting
//! [`CardTransport`] exchanges raw bytes with whatever card sits on it and reports the
//! card's Answer To Reset. Dropping the transport ends the session.

mod error;

use std::fmt;

use bytes::Bytes;
pub use error::TransportError;
use tracing::{debug, trace};

use crate::{Command, Response};

/// Trait for basic card transports
///
/// A transport is responsible for sending and receiving raw bytes. It has no
/// knowledge of command structure; interpretation of the status word happens in
/// the caller.
pub trait CardTransport: Send + fmt::Debug {
    /// Send raw bytes to the card and return the raw response
    ///
    /// The bytes are usually an APDU, but readers that pass native tag commands
    /// through unchanged accept those too.
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        trace!(command = %hex::encode(command), "Transmitting raw command");
        let result = self.do_transmit_raw(command);
        match &result {
            Ok(response) => {
                trace!(response = %hex::encode(response), "Received raw response");
            }
            Err(e) => {
                debug!(error = %e, "Transport error during transmission");
            }
        }
        result
    }

    /// Internal implementation of transmit_raw
    /// This is the method that concrete implementations should override
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError>;

    /// Answer To Reset of the card in the session
    fn atr(&self) -> Result<Bytes, TransportError>;

    /// Check if the transport is connected to a physical card
    fn is_connected(&self) -> bool;

    /// Serialize a command, transmit it and parse the response APDU
    fn transmit(&mut self, command: &Command) -> crate::Result<Response> {
        let raw = self.transmit_raw(&command.to_bytes())?;
        Ok(Response::from_bytes(&raw)?)
    }
}

/// Opens card sessions on named readers
pub trait CardConnector {
    /// Session type produced by this connector
    type Transport: CardTransport;

    /// Connect to the card on the given reader
    fn connect(&self, reader: &str) -> Result<Self::Transport, TransportError>;
}

#[cfg(test)]
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub struct MockTransport {
    /// Mock responses to return, in order
    pub responses: Vec<Bytes>,
    /// Commands that were sent
    pub commands: Vec<Bytes>,
    /// ATR reported by the mock card
    pub atr: Bytes,
}

#[cfg(test)]
impl MockTransport {
    /// Create a new mock transport with the given responses
    pub fn new(responses: Vec<Bytes>) -> Self {
        Self {
            responses,
            commands: Vec::new(),
            atr: Bytes::from_static(&[0x3B, 0x00]),
        }
    }
}

#[cfg(test)]
impl CardTransport for MockTransport {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        self.commands.push(Bytes::copy_from_slice(command));
        if self.responses.is_empty() {
            return Err(TransportError::Transmission);
        }
        Ok(self.responses.remove(0))
    }

    fn atr(&self) -> Result<Bytes, TransportError> {
        Ok(self.atr.clone())
    }

    fn is_connected(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_transmit_parses_response() {
        let mut transport = MockTransport::new(vec![Bytes::from_static(&[
            0x04, 0x42, 0x48, 0x8A, 0x90, 0x00,
        ])]);
        let cmd = Command::new_with_le(0xFF, 0xCA, 0x00, 0x00, 0x00);

        let response = transport.transmit(&cmd).unwrap();
        assert!(response.is_success());
        assert_eq!(response.payload().as_ref(), &[0x04, 0x42, 0x48, 0x8A]);
        assert_eq!(transport.commands[0].as_ref(), &[0xFF, 0xCA, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_transmit_errors() {
        let mut transport = MockTransport::new(vec![Bytes::from_static(&[0x0A])]);
        let cmd = Command::new(0xFF, 0x00, 0x00, 0x00);

        assert!(matches!(transport.transmit(&cmd), Err(Error::Response(_))));
        assert!(matches!(
            transport.transmit(&cmd),
            Err(Error::Transport(TransportError::Transmission))
        ));
    }
}
