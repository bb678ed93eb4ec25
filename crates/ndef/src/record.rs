//! NDEF records and their header byte

use bytes::{BufMut, Bytes, BytesMut};

use crate::uri;

/// Type Name Format, the low three bits of the record header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tnf {
    /// Record carries no type or payload
    Empty = 0x00,
    /// NFC Forum well-known type (`T`, `U`, `Sp`, ...)
    WellKnown = 0x01,
    /// RFC 2046 media type
    MediaType = 0x02,
    /// Absolute URI as the record type
    AbsoluteUri = 0x03,
    /// NFC Forum external type
    External = 0x04,
    /// Unknown payload type
    Unknown = 0x05,
    /// Continuation of a chunked record
    Unchanged = 0x06,
    /// Reserved value
    Reserved = 0x07,
}

impl Tnf {
    /// Decode the low three bits of a header byte
    pub const fn from_bits(bits: u8) -> Self {
        match bits & RecordHeader::TNF_MASK {
            0x00 => Self::Empty,
            0x01 => Self::WellKnown,
            0x02 => Self::MediaType,
            0x03 => Self::AbsoluteUri,
            0x04 => Self::External,
            0x05 => Self::Unknown,
            0x06 => Self::Unchanged,
            _ => Self::Reserved,
        }
    }
}

/// Decoded record header byte
///
/// ```text
/// bit  7    6    5    4    3    2..0
///      MB   ME   CF   SR   IL   TNF
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// First record of the message
    pub message_begin: bool,
    /// Last record of the message
    pub message_end: bool,
    /// Chunk flag
    pub chunked: bool,
    /// Payload length is one byte instead of four
    pub short_record: bool,
    /// An ID length byte and ID field are present
    pub id_length_present: bool,
    /// Type Name Format
    pub tnf: Tnf,
}

impl RecordHeader {
    /// Message Begin flag
    pub const MB: u8 = 0x80;
    /// Message End flag
    pub const ME: u8 = 0x40;
    /// Chunk flag
    pub const CF: u8 = 0x20;
    /// Short Record flag
    pub const SR: u8 = 0x10;
    /// ID Length present flag
    pub const IL: u8 = 0x08;
    /// Mask of the Type Name Format bits
    pub const TNF_MASK: u8 = 0x07;

    /// Parse a header byte
    pub const fn from_byte(byte: u8) -> Self {
        Self {
            message_begin: byte & Self::MB != 0,
            message_end: byte & Self::ME != 0,
            chunked: byte & Self::CF != 0,
            short_record: byte & Self::SR != 0,
            id_length_present: byte & Self::IL != 0,
            tnf: Tnf::from_bits(byte),
        }
    }

    /// Serialize the header byte
    pub const fn to_byte(self) -> u8 {
        let mut byte = self.tnf as u8;
        if self.message_begin {
            byte |= Self::MB;
        }
        if self.message_end {
            byte |= Self::ME;
        }
        if self.chunked {
            byte |= Self::CF;
        }
        if self.short_record {
            byte |= Self::SR;
        }
        if self.id_length_present {
            byte |= Self::IL;
        }
        byte
    }
}

/// A single NDEF record
///
/// Message position flags are not part of the record; they are derived from the
/// record's place in an [`NdefMessage`](crate::NdefMessage) when encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdefRecord {
    /// Type Name Format
    pub tnf: Tnf,
    /// Record type, interpreted according to `tnf`
    pub record_type: Bytes,
    /// Record payload
    pub payload: Bytes,
}

impl NdefRecord {
    /// Well-known type of text records
    pub const TEXT_TYPE: &'static [u8] = b"T";
    /// Well-known type of URI records
    pub const URI_TYPE: &'static [u8] = b"U";

    /// Status byte bit selecting UTF-16 text
    const TEXT_UTF16: u8 = 0x80;
    /// Status byte bits holding the language code length
    const TEXT_LANG_MASK: u8 = 0x3F;

    /// Create a record from its parts
    pub fn new(tnf: Tnf, record_type: impl Into<Bytes>, payload: impl Into<Bytes>) -> Self {
        Self {
            tnf,
            record_type: record_type.into(),
            payload: payload.into(),
        }
    }

    /// Create a UTF-8 text record
    pub fn text(language: &str, text: &str) -> Self {
        let language = &language.as_bytes()[..language.len().min(Self::TEXT_LANG_MASK as usize)];
        let mut payload = BytesMut::with_capacity(1 + language.len() + text.len());
        payload.put_u8(language.len() as u8);
        payload.put_slice(language);
        payload.put_slice(text.as_bytes());
        Self::new(Tnf::WellKnown, Self::TEXT_TYPE, payload.freeze())
    }

    /// Create a URI record, abbreviating the longest known prefix
    pub fn uri(uri: &str) -> Self {
        let (code, rest) = uri::abbreviate(uri);
        let mut payload = BytesMut::with_capacity(1 + rest.len());
        payload.put_u8(code);
        payload.put_slice(rest.as_bytes());
        Self::new(Tnf::WellKnown, Self::URI_TYPE, payload.freeze())
    }

    /// Create a media-type record
    pub fn mime(mime_type: &str, payload: impl Into<Bytes>) -> Self {
        Self::new(
            Tnf::MediaType,
            Bytes::copy_from_slice(mime_type.as_bytes()),
            payload,
        )
    }

    fn is_well_known(&self, record_type: &[u8]) -> bool {
        self.tnf == Tnf::WellKnown && self.record_type.as_ref() == record_type
    }

    /// Language code and text of a text record
    pub fn as_text(&self) -> Option<(String, String)> {
        if !self.is_well_known(Self::TEXT_TYPE) {
            return None;
        }
        let (&status, rest) = self.payload.split_first()?;
        let lang_len = usize::from(status & Self::TEXT_LANG_MASK);
        if rest.len() < lang_len {
            return None;
        }
        let (language, body) = rest.split_at(lang_len);
        let text = if status & Self::TEXT_UTF16 != 0 {
            let units: Vec<u16> = body
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            char::decode_utf16(units)
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        } else {
            String::from_utf8_lossy(body).into_owned()
        };
        Some((String::from_utf8_lossy(language).into_owned(), text))
    }

    /// Full URI of a URI record, with the prefix code expanded
    pub fn as_uri(&self) -> Option<String> {
        if !self.is_well_known(Self::URI_TYPE) {
            return None;
        }
        let (&code, rest) = self.payload.split_first()?;
        Some(format!(
            "{}{}",
            uri::prefix(code),
            String::from_utf8_lossy(rest)
        ))
    }

    /// MIME type of a media-type record
    pub fn mime_type(&self) -> Option<String> {
        (self.tnf == Tnf::MediaType)
            .then(|| String::from_utf8_lossy(&self.record_type).into_owned())
    }

    /// Append the encoded record, with the given message position flags
    ///
    /// The record type must fit in one length byte; [`NdefMessage`](crate::NdefMessage)
    /// checks that before calling.
    pub(crate) fn encode_into(&self, buf: &mut BytesMut, message_begin: bool, message_end: bool) {
        let short_record = self.payload.len() < 256;
        let header = RecordHeader {
            message_begin,
            message_end,
            chunked: false,
            short_record,
            id_length_present: false,
            tnf: self.tnf,
        };

        buf.put_u8(header.to_byte());
        buf.put_u8(self.record_type.len() as u8);
        if short_record {
            buf.put_u8(self.payload.len() as u8);
        } else {
            buf.put_u32(self.payload.len() as u32);
        }
        buf.put_slice(&self.record_type);
        buf.put_slice(&self.payload);
    }
}
