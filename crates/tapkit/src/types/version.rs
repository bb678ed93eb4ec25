use tapkit_apdu_core::Response;

use super::{CardProfile, CardType};

/// Reply to the native GET_VERSION command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInfo {
    /// Fixed header, always 0x00 on genuine tags
    pub header: u8,
    /// Vendor ID (0x04 for NXP)
    pub vendor: u8,
    /// Product type
    pub product_type: u8,
    /// Product subtype
    pub product_subtype: u8,
    /// Major product version
    pub major_version: u8,
    /// Minor product version
    pub minor_version: u8,
    /// Storage size code
    pub storage_size: u8,
    /// Protocol type
    pub protocol: u8,
}

impl VersionInfo {
    /// Length of the reply without the status word
    pub const LEN: usize = 8;

    /// Product type of NTAG21x
    pub const PRODUCT_NTAG: u8 = 0x04;
    /// Product type of MIFARE Ultralight
    pub const PRODUCT_ULTRALIGHT: u8 = 0x03;

    /// Parse a GET_VERSION response
    ///
    /// Tags without GET_VERSION sometimes answer 90 00 with garbage, so the header
    /// byte must be zero as well.
    pub fn parse(response: &Response) -> Option<Self> {
        if !response.is_success() {
            return None;
        }
        let version = Self::from_bytes(response.payload())?;
        (version.header == 0x00).then_some(version)
    }

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let bytes: &[u8; Self::LEN] = bytes.get(..Self::LEN)?.try_into().ok()?;
        let [
            header,
            vendor,
            product_type,
            product_subtype,
            major_version,
            minor_version,
            storage_size,
            protocol,
        ] = *bytes;
        Some(Self {
            header,
            vendor,
            product_type,
            product_subtype,
            major_version,
            minor_version,
            storage_size,
            protocol,
        })
    }

    /// Family identified by product type and storage size
    pub const fn profile(&self) -> Option<CardProfile> {
        match (self.product_type, self.storage_size) {
            (Self::PRODUCT_NTAG, 0x0F) => Some(CardProfile::new(CardType::Ntag213, 180)),
            (Self::PRODUCT_NTAG, 0x11) => Some(CardProfile::new(CardType::Ntag215, 504)),
            (Self::PRODUCT_NTAG, 0x13) => Some(CardProfile::new(CardType::Ntag216, 888)),
            (Self::PRODUCT_ULTRALIGHT, 0x0B) => {
                Some(CardProfile::new(CardType::MifareUltralightEv1, 48))
            }
            (Self::PRODUCT_ULTRALIGHT, 0x0E) => {
                Some(CardProfile::new(CardType::MifareUltralightEv1, 128))
            }
            (Self::PRODUCT_ULTRALIGHT, _) => Some(CardProfile::new(CardType::MifareUltralight, 64)),
            _ => None,
        }
    }
}
