//! TLV framing of NDEF messages in tag memory
//!
//! Type 2 and Type 5 tags store their data area as a sequence of TLV blocks. The NDEF
//! message sits in the `03` block; lock and memory control blocks may precede it and a
//! `FE` terminator ends the area.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::error::{NdefError, Result};

/// Padding byte, no length field
pub const NULL: u8 = 0x00;
/// Lock control TLV
pub const LOCK_CONTROL: u8 = 0x01;
/// Memory control TLV
pub const MEMORY_CONTROL: u8 = 0x02;
/// NDEF message TLV
pub const NDEF_MESSAGE: u8 = 0x03;
/// Proprietary TLV
pub const PROPRIETARY: u8 = 0xFD;
/// Terminator TLV, no length field
pub const TERMINATOR: u8 = 0xFE;

/// Length byte announcing a three byte length field
const LONG_LENGTH: u8 = 0xFF;

/// TLV contents of a freshly erased tag: an empty NDEF message and a terminator
pub const EMPTY_NDEF: [u8; 4] = [NDEF_MESSAGE, 0x00, TERMINATOR, 0x00];

/// Wrap an encoded message as `03 <len> <message> FE`
///
/// Lengths below 255 use one byte, longer ones `FF` followed by two bytes big-endian.
pub fn wrap(message: &[u8]) -> Result<Bytes> {
    let len = message.len();
    if len > usize::from(u16::MAX) {
        return Err(NdefError::MessageTooLarge(len));
    }

    let mut buf = BytesMut::with_capacity(len + 5);
    buf.put_u8(NDEF_MESSAGE);
    if len < usize::from(LONG_LENGTH) {
        buf.put_u8(len as u8);
    } else {
        buf.put_u8(LONG_LENGTH);
        buf.put_u16(len as u16);
    }
    buf.put_slice(message);
    buf.put_u8(TERMINATOR);
    Ok(buf.freeze())
}

/// Result of scanning a (possibly partial) dump of tag memory for the NDEF TLV
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlvScan<'a> {
    /// The NDEF TLV is complete; holds the message bytes
    Complete(&'a [u8]),
    /// More memory is needed to reach or finish the NDEF TLV
    Incomplete,
    /// The data area holds no NDEF TLV
    Absent,
}

/// Locate the NDEF message in a dump of the data area
///
/// Leading NULL, lock control, memory control and proprietary TLVs are skipped. Any
/// other leading byte means the area is not NDEF formatted.
pub fn scan(data: &[u8]) -> TlvScan<'_> {
    let mut offset = 0;
    loop {
        let Some(&tag) = data.get(offset) else {
            return TlvScan::Incomplete;
        };
        match tag {
            NULL => {
                offset += 1;
                continue;
            }
            TERMINATOR => return TlvScan::Absent,
            NDEF_MESSAGE | LOCK_CONTROL | MEMORY_CONTROL | PROPRIETARY => {}
            _ => {
                trace!(offset, tag, "Data area is not NDEF formatted");
                return TlvScan::Absent;
            }
        }

        let Some((value_start, len)) = read_length(data, offset + 1) else {
            return TlvScan::Incomplete;
        };
        let value_end = value_start + len;
        if tag == NDEF_MESSAGE {
            return if value_end <= data.len() {
                TlvScan::Complete(&data[value_start..value_end])
            } else {
                TlvScan::Incomplete
            };
        }
        trace!(offset, tag, len, "Skipping control TLV");
        offset = value_end;
    }
}

/// Read a TLV length field at `offset`, returning the value offset and length
fn read_length(data: &[u8], offset: usize) -> Option<(usize, usize)> {
    match *data.get(offset)? {
        LONG_LENGTH => {
            let high = *data.get(offset + 1)?;
            let low = *data.get(offset + 2)?;
            Some((offset + 3, usize::from(u16::from_be_bytes([high, low]))))
        }
        len => Some((offset + 1, usize::from(len))),
    }
}
