use super::{CardProfile, CardType};

/// NFC Forum Type 2 capability container (page 3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityContainer {
    /// NDEF magic number
    pub magic: u8,
    /// Mapping version
    pub version: u8,
    /// Data area size in units of 8 bytes
    pub size: u8,
    /// Read/write access conditions
    pub access: u8,
}

impl CapabilityContainer {
    /// Magic number of an NDEF formatted tag
    pub const NDEF_MAGIC: u8 = 0xE1;
    /// Length of the container
    pub const LEN: usize = 4;

    /// Parse the four CC bytes at the start of `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let [magic, version, size, access] = *bytes.get(..Self::LEN)? else {
            return None;
        };
        Some(Self {
            magic,
            version,
            size,
            access,
        })
    }

    /// Whether the tag is NDEF formatted
    pub const fn is_ndef(&self) -> bool {
        self.magic == Self::NDEF_MAGIC
    }

    /// Announced data area in bytes
    pub const fn data_area_len(&self) -> usize {
        self.size as usize * 8
    }

    /// Family implied by the announced data area size
    ///
    /// NTAG sizes are too large for any plain Ultralight, so they identify the
    /// family without GET_VERSION having answered.
    pub const fn profile(&self) -> Option<CardProfile> {
        if !self.is_ndef() {
            return None;
        }
        match self.size {
            0x06 => Some(CardProfile::new(CardType::MifareUltralight, 48)),
            0x12 => Some(CardProfile::new(CardType::Ntag213, 180)),
            0x3E => Some(CardProfile::new(CardType::Ntag215, 504)),
            0x6D => Some(CardProfile::new(CardType::Ntag216, 888)),
            _ => None,
        }
    }
}
