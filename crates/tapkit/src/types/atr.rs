use bytes::Bytes;

use super::Protocol;

/// Answer To Reset of a PC/SC storage card
///
/// Readers synthesise the ATR of contactless storage cards per PC/SC part 3:
///
/// ```text
/// 3B 8F 80 01 80 4F 0C A0 00 00 03 06 SS NN NN 00 00 00 00 TCK
///                      |- RID ---|    |  |- card name
///                                     |- standard
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atr(Bytes);

impl Atr {
    /// Minimum length of a storage card ATR
    const STORAGE_CARD_LEN: usize = 15;
    /// Offset of the low card name byte
    const CARD_NAME_OFFSET: usize = 14;

    const ISO15693_PATTERN: [u8; 3] = [0x03, 0x06, 0x0B];
    const ISO14443A_PATTERN: [u8; 4] = [0x03, 0x06, 0x03, 0x00];

    /// Card name byte of MIFARE Classic 1K
    pub const CARD_NAME_CLASSIC_1K: u8 = 0x01;
    /// Card name byte shared by Ultralight and NTAG
    pub const CARD_NAME_ULTRALIGHT: u8 = 0x03;

    /// Wrap raw ATR bytes
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Raw ATR bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether the ATR has the PC/SC storage card shape (`3B 8F` or `3B 8B`)
    pub fn is_storage_card(&self) -> bool {
        self.0.len() >= Self::STORAGE_CARD_LEN
            && self.0[0] == 0x3B
            && matches!(self.0[1], 0x8F | 0x8B)
    }

    fn contains(&self, pattern: &[u8]) -> bool {
        self.0.windows(pattern.len()).any(|window| window == pattern)
    }

    /// Whether the ATR names ISO 15693 as the standard
    pub fn has_iso15693_pattern(&self) -> bool {
        self.contains(&Self::ISO15693_PATTERN)
    }

    /// Whether the ATR names ISO 14443-3A as the standard
    pub fn has_iso14443a_pattern(&self) -> bool {
        self.contains(&Self::ISO14443A_PATTERN)
    }

    /// Low card name byte
    pub fn card_name(&self) -> Option<u8> {
        self.0.get(Self::CARD_NAME_OFFSET).copied()
    }

    /// Radio protocol named by a storage card ATR
    pub fn protocol(&self) -> Protocol {
        if !self.is_storage_card() {
            Protocol::Unknown
        } else if self.has_iso15693_pattern() {
            Protocol::NfcV
        } else if self.has_iso14443a_pattern() {
            Protocol::NfcA
        } else {
            Protocol::Unknown
        }
    }
}
