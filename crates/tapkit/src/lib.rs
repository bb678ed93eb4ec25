//! Card detection, NDEF storage and page/block I/O for NFC tags on PC/SC readers
//!
//! Supported families are NTAG21x and MIFARE Ultralight (NFC Forum Type 2), MIFARE
//! Classic 1K and ISO 15693 vicinity tags. [`CardOperations`] is the entry point: it
//! opens a session per call through any [`CardConnector`](tapkit_apdu_core::CardConnector),
//! identifies the card and picks the addressing scheme of its family.
//!
//! ```
//! use tapkit::CardOperations;
//! use tapkit_apdu_core::CardConnector;
//!
//! fn tag_url<C: CardConnector>(
//!     operations: &CardOperations<C>,
//!     reader: &str,
//! ) -> tapkit::Result<Option<String>> {
//!     let card = operations.get_card_uid(reader)?;
//!     println!("{} {}", card.card_type(), hex::encode(&card.uid));
//!     Ok(card.url)
//! }
//! ```
//!
//! The lower level modules work on an open [`CardTransport`](tapkit_apdu_core::CardTransport)
//! and can be used directly when the caller manages sessions itself.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod classic;
mod commands;
pub mod constants;
pub mod crypto;
pub mod detect;
mod error;
pub mod io;
mod operations;
pub mod payload;
pub mod storage;
pub mod types;
pub mod ultralight;

#[cfg(test)]
mod mock;

pub use classic::{ClassicKey, KeyType};
pub use constants::{BLOCK_SIZE, PAGE_SIZE};
pub use error::{Error, ErrorKind, Result};
pub use operations::CardOperations;
pub use payload::{PayloadType, RecordInput, RecordKind};
pub use types::{CardIdentity, CardProfile, CardType, PageWrite, PageWriteResult, Protocol};
