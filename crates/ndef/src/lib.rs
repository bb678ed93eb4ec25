//! NDEF codec for NFC Forum tags
//!
//! Tags store an NDEF message inside a TLV block (`03 <len> <message> FE`). A message
//! is a run of records, each with a header byte carrying the MB/ME/SR flags and the
//! 3-bit Type Name Format, followed by the type, optional ID and payload.
//!
//! ```
//! use tapkit_ndef::{NdefContent, NdefMessage, NdefRecord, tlv};
//!
//! let message = NdefMessage::new(vec![
//!     NdefRecord::uri("https://example.com/spool/42"),
//!     NdefRecord::text("en", "PLA, 1.75 mm"),
//! ]);
//! let framed = tlv::wrap(&message.to_bytes()?)?;
//!
//! let tlv::TlvScan::Complete(body) = tlv::scan(&framed) else { unreachable!() };
//! let content = NdefContent::decode(body)?;
//! assert_eq!(content.url.as_deref(), Some("https://example.com/spool/42"));
//! assert_eq!(content.data.as_deref(), Some("PLA, 1.75 mm"));
//! # Ok::<(), tapkit_ndef::NdefError>(())
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod content;
mod error;
mod message;
mod record;
pub mod tlv;
pub mod uri;

pub use content::{DataType, NdefContent};
pub use error::{NdefError, Result};
pub use message::{NdefMessage, RecordIter};
pub use record::{NdefRecord, RecordHeader, Tnf};

/// MIME type of JSON payloads
pub const MIME_JSON: &str = "application/json";
/// MIME type of opaque binary payloads
pub const MIME_OCTET_STREAM: &str = "application/octet-stream";
