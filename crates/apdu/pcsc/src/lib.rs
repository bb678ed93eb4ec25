//! PC/SC transport implementation for tapkit
//!
//! This crate implements the `CardTransport` and `CardConnector` traits from
//! `tapkit-apdu-core` on top of the system PC/SC service (pcsc-lite on Linux and
//! macOS, WinSCard on Windows).
//!
//! # Examples
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use tapkit_apdu_core::prelude::*;
//! use tapkit_transport_pcsc::PcscDeviceManager;
//!
//! let manager = PcscDeviceManager::new()?;
//! for reader in manager.list_readers()? {
//!     println!("{} (card present: {})", reader.name(), reader.has_card());
//! }
//!
//! let reader = manager.wait_for_card("ACS ACR122U PICC Interface 00 00")?;
//! let mut transport = manager.connect(reader.name())?;
//! let uid = transport.transmit(&Command::new_with_le(0xFF, 0xCA, 0x00, 0x00, 0x00))?;
//! println!("UID status: {}", uid.status());
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![warn(missing_docs)]

mod config;
mod error;
mod manager;
mod reader;
mod transport;

pub use config::{PcscConfig, ShareMode};
pub use error::PcscError;
pub use manager::PcscDeviceManager;
pub use reader::PcscReader;
pub use transport::PcscTransport;

// Re-export some pcsc types for convenience
pub use pcsc::{Protocol, Protocols};
