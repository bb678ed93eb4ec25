use zeroize::Zeroize;

use crate::constants::classic::ACCESS_BITS;

/// Last block of a MIFARE Classic sector
///
/// ```text
/// 0..6    key A
/// 6..10   access bits and general purpose byte
/// 10..16  key B
/// ```
#[derive(Clone, PartialEq, Eq, Zeroize)]
pub struct SectorTrailer {
    /// Key A
    pub key_a: [u8; 6],
    /// Access conditions and general purpose byte
    pub access_bits: [u8; 4],
    /// Key B
    pub key_b: [u8; 6],
}

impl SectorTrailer {
    /// Split a trailer block into its fields
    pub fn from_block(block: &[u8; 16]) -> Self {
        let mut trailer = Self {
            key_a: [0; 6],
            access_bits: [0; 4],
            key_b: [0; 6],
        };
        trailer.key_a.copy_from_slice(&block[..ACCESS_BITS.start]);
        trailer.access_bits.copy_from_slice(&block[ACCESS_BITS]);
        trailer.key_b.copy_from_slice(&block[ACCESS_BITS.end..]);
        trailer
    }

    /// Replace both keys, keeping the access conditions
    pub const fn with_keys(&self, key_a: [u8; 6], key_b: [u8; 6]) -> Self {
        Self {
            key_a,
            access_bits: self.access_bits,
            key_b,
        }
    }

    /// Serialize to a trailer block
    pub fn to_block(&self) -> [u8; 16] {
        let mut block = [0u8; 16];
        block[..ACCESS_BITS.start].copy_from_slice(&self.key_a);
        block[ACCESS_BITS].copy_from_slice(&self.access_bits);
        block[ACCESS_BITS.end..].copy_from_slice(&self.key_b);
        block
    }
}

impl std::fmt::Debug for SectorTrailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectorTrailer")
            .field("access_bits", &hex::encode(self.access_bits))
            .finish_non_exhaustive()
    }
}
