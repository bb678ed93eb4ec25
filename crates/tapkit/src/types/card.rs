use bytes::Bytes;
use derive_more::Display;
use serde::Serialize;
use tapkit_ndef::{DataType, NdefContent};

use super::{DataArea, PasswordLayout, serialize_display, serialize_hex};

/// Tag family reported by detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum CardType {
    /// NXP NTAG213, 180 bytes
    #[display("NTAG213")]
    Ntag213,
    /// NXP NTAG215, 504 bytes
    #[display("NTAG215")]
    Ntag215,
    /// NXP NTAG216, 888 bytes
    #[display("NTAG216")]
    Ntag216,
    /// MIFARE Ultralight without GET_VERSION support
    #[display("MIFARE Ultralight")]
    MifareUltralight,
    /// MIFARE Ultralight EV1 (MF0UL11 or MF0UL21)
    #[display("MIFARE Ultralight EV1")]
    MifareUltralightEv1,
    /// MIFARE Classic 1K
    #[display("MIFARE Classic")]
    MifareClassic,
    /// Generic ISO 15693 vicinity tag
    #[display("ISO 15693")]
    Iso15693,
    /// NXP ICODE SLIX family
    #[display("ICode SLIX")]
    IcodeSlix,
    /// Nothing in the cascade matched
    #[display("Unknown")]
    Unknown,
}

/// How a family's memory is addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressScheme {
    /// 4-byte pages, user data from page 4 (NTAG, Ultralight and anything unrecognised)
    Type2Pages,
    /// 16-byte blocks grouped in authenticated sectors
    ClassicBlocks,
    /// 4-byte blocks, capability container in block 0
    VicinityBlocks,
}

impl CardType {
    /// Addressing scheme of the family
    pub const fn scheme(self) -> AddressScheme {
        match self {
            Self::MifareClassic => AddressScheme::ClassicBlocks,
            Self::Iso15693 | Self::IcodeSlix => AddressScheme::VicinityBlocks,
            _ => AddressScheme::Type2Pages,
        }
    }

    /// Password, PACK, configuration and dynamic lock pages of NTAG21x tags
    pub const fn password_layout(self) -> Option<PasswordLayout> {
        match self {
            Self::Ntag213 => Some(PasswordLayout::NTAG213),
            Self::Ntag215 => Some(PasswordLayout::NTAG215),
            Self::Ntag216 => Some(PasswordLayout::NTAG216),
            _ => None,
        }
    }
}

/// Radio protocol, read from the ATR independently of the detected family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
pub enum Protocol {
    /// ISO 14443-3A
    #[display("NFC-A")]
    NfcA,
    /// ISO 15693
    #[display("NFC-V")]
    NfcV,
    /// ATR carries no recognised pattern
    #[default]
    #[display("Unknown")]
    Unknown,
}

impl Protocol {
    /// Name of the ISO standard, empty when unknown
    pub const fn iso_label(self) -> &'static str {
        match self {
            Self::NfcA => "ISO 14443-3A",
            Self::NfcV => "ISO 15693",
            Self::Unknown => "",
        }
    }
}

/// Family, capacity and writability assigned together by detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CardProfile {
    /// Detected family
    #[serde(rename = "type", serialize_with = "serialize_display")]
    pub card_type: CardType,
    /// Total memory in bytes
    pub size: usize,
    /// Whether the tag accepts writes
    pub writable: bool,
}

impl CardProfile {
    /// Profile of a family with the given size
    pub const fn new(card_type: CardType, size: usize) -> Self {
        Self {
            card_type,
            size,
            writable: true,
        }
    }

    /// Profile returned when nothing in the cascade matched
    pub const fn unknown() -> Self {
        Self {
            card_type: CardType::Unknown,
            size: 0,
            writable: true,
        }
    }

    /// Pages or blocks available to NDEF data
    pub const fn user_area(&self) -> DataArea {
        match self.card_type {
            CardType::Ntag213 | CardType::Unknown => DataArea::new(4, 39),
            CardType::Ntag215 => DataArea::new(4, 129),
            CardType::Ntag216 => DataArea::new(4, 225),
            CardType::MifareUltralightEv1 if self.size >= 128 => DataArea::new(4, 35),
            CardType::MifareUltralight | CardType::MifareUltralightEv1 => DataArea::new(4, 15),
            CardType::MifareClassic => DataArea::new(4, 63),
            CardType::Iso15693 => DataArea::new(1, 79),
            CardType::IcodeSlix => DataArea::new(1, 27),
        }
    }

    /// Pages or blocks scanned when reading NDEF back
    ///
    /// NTAG213 and unrecognised tags are read through the dynamic lock and
    /// configuration pages, which end the scan harmlessly if no terminator came first.
    pub const fn ndef_read_area(&self) -> DataArea {
        match self.card_type {
            CardType::Ntag213 | CardType::Unknown => DataArea::new(4, 43),
            _ => self.user_area(),
        }
    }

    /// Bytes of NDEF TLV the user area holds
    pub fn capacity(&self) -> usize {
        let area = self.user_area();
        match self.card_type.scheme() {
            AddressScheme::ClassicBlocks => area.data_blocks().count() * crate::BLOCK_SIZE,
            AddressScheme::Type2Pages | AddressScheme::VicinityBlocks => {
                area.len() * crate::PAGE_SIZE
            }
        }
    }
}

/// Everything known about the card on a reader
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardIdentity {
    /// Card UID
    #[serde(serialize_with = "serialize_hex")]
    pub uid: Bytes,
    /// Answer To Reset
    #[serde(serialize_with = "serialize_hex")]
    pub atr: Bytes,
    /// Detected family and capacity
    #[serde(flatten)]
    pub profile: CardProfile,
    /// Radio protocol
    #[serde(serialize_with = "serialize_display")]
    pub protocol: Protocol,
    /// ISO standard of `protocol`
    #[serde(rename = "protocolISO")]
    pub protocol_iso: &'static str,
    /// URI of the stored NDEF message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Data of the stored NDEF message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Kind of `data`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
}

impl CardIdentity {
    /// Identity of a detected card with no NDEF content
    pub fn new(uid: Bytes, atr: Bytes, profile: CardProfile, protocol: Protocol) -> Self {
        Self {
            uid,
            atr,
            profile,
            protocol,
            protocol_iso: protocol.iso_label(),
            url: None,
            data: None,
            data_type: None,
        }
    }

    /// Detected family
    pub const fn card_type(&self) -> CardType {
        self.profile.card_type
    }

    /// Attach decoded NDEF content
    pub fn with_content(mut self, content: NdefContent) -> Self {
        self.url = content.url;
        self.data = content.data;
        self.data_type = content.data_type;
        self
    }
}
