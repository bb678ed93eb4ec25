//! PC/SC transport implementation

use std::{ffi::CString, fmt, result::Result};

use pcsc::{Card, Context, Disposition};
use tapkit_apdu_core::prelude::*;
use tracing::debug;

use crate::{config::PcscConfig, error::PcscError};

/// Transport implementation using PC/SC
///
/// The card connection is released with `LeaveCard` when the transport is dropped,
/// so a session never outlives the operation that opened it.
pub struct PcscTransport {
    /// PC/SC context
    context: Context,
    /// Card connection, if established
    card: Option<Card>,
    /// Reader name
    reader_name: String,
    /// Configuration
    config: PcscConfig,
}

impl fmt::Debug for PcscTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscTransport")
            .field("reader_name", &self.reader_name)
            .field("has_card", &self.card.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl PcscTransport {
    /// Connect to the card on the specified reader
    pub(crate) fn connect(
        context: Context,
        reader_name: &str,
        config: PcscConfig,
    ) -> Result<Self, PcscError> {
        let mut transport = Self {
            context,
            card: None,
            reader_name: reader_name.to_string(),
            config,
        };
        transport.connect_card()?;
        Ok(transport)
    }

    fn connect_card(&mut self) -> Result<(), PcscError> {
        if self.card.is_some() {
            return Ok(());
        }

        let reader_cstr = CString::new(self.reader_name.clone())
            .map_err(|_| PcscError::ReaderNotFound(self.reader_name.clone()))?;

        match self.context.connect(
            &reader_cstr,
            self.config.share_mode.into(),
            self.config.protocols,
        ) {
            Ok(card) => {
                self.card = Some(card);
                Ok(())
            }
            Err(pcsc::Error::NoSmartcard) => Err(PcscError::NoCard(self.reader_name.clone())),
            Err(pcsc::Error::UnknownReader) => {
                Err(PcscError::ReaderNotFound(self.reader_name.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get the reader name
    pub fn reader_name(&self) -> &str {
        &self.reader_name
    }

    fn transmit_command(&mut self, command: &[u8]) -> Result<Bytes, PcscError> {
        self.connect_card()?;
        let card = self
            .card
            .as_mut()
            .ok_or_else(|| PcscError::NoCard(self.reader_name.clone()))?;

        let mut response_buffer = [0u8; pcsc::MAX_BUFFER_SIZE];
        match card.transmit(command, &mut response_buffer) {
            Ok(response) => Ok(Bytes::copy_from_slice(response)),
            Err(e @ (pcsc::Error::ResetCard | pcsc::Error::RemovedCard)) => {
                // The handle is dead either way
                self.card = None;
                if self.config.auto_reconnect && e == pcsc::Error::ResetCard {
                    debug!(reader = %self.reader_name, "Card reset, reconnecting once");
                    self.connect_card()?;
                    if let Some(card) = self.card.as_mut() {
                        let response = card.transmit(command, &mut response_buffer)?;
                        return Ok(Bytes::copy_from_slice(response));
                    }
                }
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl CardTransport for PcscTransport {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        self.transmit_command(command).map_err(TransportError::from)
    }

    fn atr(&self) -> Result<Bytes, TransportError> {
        let card = self
            .card
            .as_ref()
            .ok_or_else(|| TransportError::NoCard(self.reader_name.clone()))?;
        card.get_attribute_owned(pcsc::Attribute::AtrString)
            .map(Bytes::from)
            .map_err(|e| PcscError::from(e).into())
    }

    fn is_connected(&self) -> bool {
        self.card.is_some()
    }
}

impl Drop for PcscTransport {
    fn drop(&mut self) {
        if let Some(card) = self.card.take() {
            if let Err((_, e)) = card.disconnect(Disposition::LeaveCard) {
                debug!(reader = %self.reader_name, error = %e, "Failed to disconnect card");
            }
        }
    }
}
