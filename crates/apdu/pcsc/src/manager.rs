//! Device manager for PC/SC operations

use std::ffi::CString;

use pcsc::{Context, ReaderState, Scope, State};
use tapkit_apdu_core::{CardConnector, TransportError};
use tracing::{debug, instrument};

use crate::config::PcscConfig;
use crate::error::PcscError;
use crate::reader::{PcscReader, card_present};
use crate::transport::PcscTransport;

/// Manager for PC/SC device operations
#[allow(missing_debug_implementations)]
pub struct PcscDeviceManager {
    /// PC/SC context
    context: Context,
    /// Configuration applied to every session opened through [`CardConnector`]
    config: PcscConfig,
}

impl PcscDeviceManager {
    /// Create a new PC/SC device manager
    pub fn new() -> Result<Self, PcscError> {
        Self::with_config(PcscConfig::default())
    }

    /// Create a new PC/SC device manager with custom session configuration
    pub fn with_config(config: PcscConfig) -> Result<Self, PcscError> {
        let context = Context::establish(Scope::User)?;
        Ok(Self { context, config })
    }

    /// List all available card readers
    pub fn list_readers(&self) -> Result<Vec<PcscReader>, PcscError> {
        let readers = match self.context.list_readers_owned() {
            Ok(readers) => readers,
            Err(pcsc::Error::NoReadersAvailable) => return Err(PcscError::NoReadersAvailable),
            Err(e) => return Err(e.into()),
        };
        if readers.is_empty() {
            return Err(PcscError::NoReadersAvailable);
        }

        let mut result = Vec::with_capacity(readers.len());
        for reader_name in readers {
            let mut reader_states = [ReaderState::new(reader_name.clone(), State::UNAWARE)];

            // A zero timeout only queries the current state
            match self
                .context
                .get_status_change(Some(std::time::Duration::ZERO), &mut reader_states)
            {
                Ok(()) => result.push(PcscReader::from_reader_state(&reader_states[0])),
                Err(_) => result.push(PcscReader::new(
                    reader_name.to_string_lossy().into_owned(),
                    false,
                    None,
                )),
            }
        }

        Ok(result)
    }

    /// Open a connection to the card on a specific reader
    pub fn open_reader(&self, reader_name: &str) -> Result<PcscTransport, PcscError> {
        self.open_reader_with_config(reader_name, self.config.clone())
    }

    /// Open a connection to a specific reader with custom configuration
    pub fn open_reader_with_config(
        &self,
        reader_name: &str,
        config: PcscConfig,
    ) -> Result<PcscTransport, PcscError> {
        PcscTransport::connect(self.context.clone(), reader_name, config)
    }

    /// Block until a card is present on the reader
    ///
    /// There is no timeout; the wait ends when a card arrives, or with an error when
    /// the reader disappears or the context is cancelled from elsewhere.
    #[instrument(skip(self))]
    pub fn wait_for_card(&self, reader_name: &str) -> Result<PcscReader, PcscError> {
        let name = CString::new(reader_name)
            .map_err(|_| PcscError::ReaderNotFound(reader_name.to_string()))?;
        let mut reader_states = [ReaderState::new(name, State::UNAWARE)];

        loop {
            self.context.get_status_change(None, &mut reader_states)?;
            let state = &reader_states[0];
            let event = state.event_state();

            if event.intersects(State::UNKNOWN | State::IGNORE) {
                return Err(PcscError::ReaderNotFound(reader_name.to_string()));
            }
            if card_present(event) {
                debug!("Card present");
                return Ok(PcscReader::from_reader_state(state));
            }

            reader_states[0].sync_current_state();
        }
    }
}

impl CardConnector for PcscDeviceManager {
    type Transport = PcscTransport;

    fn connect(&self, reader: &str) -> Result<Self::Transport, TransportError> {
        self.open_reader(reader).map_err(TransportError::from)
    }
}
