//! Core types for exchanging APDUs with contactless cards through a PC/SC style reader
//!
//! This crate provides the wire-level building blocks shared by every tapkit crate:
//!
//! - [`Command`]: an ISO/IEC 7816-4 command APDU, including the `FF` class pseudo-APDUs
//!   that PC/SC readers use to talk to storage cards
//! - [`Response`] and [`StatusWord`]: response parsing and status interpretation
//! - [`CardTransport`] and [`CardConnector`]: the session abstraction that production
//!   readers and test doubles both implement
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub use bytes::{Bytes, BytesMut};

pub mod command;
pub mod response;
pub mod transport;

mod error;
pub use error::{Error, Result};

pub use command::Command;
pub use response::status::StatusWord;
pub use response::{Response, ResponseError, StatusError};
pub use transport::{CardConnector, CardTransport, TransportError};

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{
        Bytes, BytesMut, CardConnector, CardTransport, Command, Error, Response, ResponseError,
        Result, StatusError, StatusWord, TransportError, response::status::common,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reexports() {
        let cmd = Command::new_with_le(0xFF, 0xCA, 0x00, 0x00, 0x00);
        assert_eq!(cmd.cla, 0xFF);
        assert_eq!(cmd.ins, 0xCA);
        assert_eq!(cmd.to_bytes().as_ref(), &[0xFF, 0xCA, 0x00, 0x00, 0x00]);

        let resp = Response::from_bytes(&[0x04, 0x42, 0x90, 0x00]).unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.payload().as_ref(), &[0x04, 0x42]);
        assert_eq!(resp.status(), StatusWord::new(0x90, 0x00));
    }
}
