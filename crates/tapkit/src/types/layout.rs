use std::ops::RangeInclusive;

use crate::classic::is_sector_trailer;

/// Inclusive range of pages or blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataArea {
    /// First address
    pub first: u8,
    /// Last address
    pub last: u8,
}

impl DataArea {
    /// Area spanning `first..=last`
    pub const fn new(first: u8, last: u8) -> Self {
        Self { first, last }
    }

    /// Whether `address` lies inside the area
    pub const fn contains(&self, address: u8) -> bool {
        address >= self.first && address <= self.last
    }

    /// Number of addresses in the area
    pub const fn len(&self) -> usize {
        (self.last - self.first) as usize + 1
    }

    /// Areas always hold at least one address
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Every address in order
    pub const fn addresses(&self) -> RangeInclusive<u8> {
        self.first..=self.last
    }

    /// MIFARE Classic data blocks in order, sector trailers left out
    pub fn data_blocks(&self) -> impl Iterator<Item = u8> + use<> {
        self.addresses().filter(|block| !is_sector_trailer(*block))
    }
}

/// Pages holding the NTAG21x password configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordLayout {
    /// PWD
    pub password: u8,
    /// PACK, followed by two reserved bytes
    pub pack: u8,
    /// CFG0, byte 3 is AUTH0
    pub config: u8,
    /// Dynamic lock bytes
    pub dynamic_lock: u8,
}

impl PasswordLayout {
    /// Index of AUTH0 inside the configuration page
    pub const AUTH0_OFFSET: usize = 3;

    /// NTAG213
    pub const NTAG213: Self = Self {
        password: 43,
        pack: 44,
        config: 41,
        dynamic_lock: 40,
    };

    /// NTAG215
    pub const NTAG215: Self = Self {
        password: 133,
        pack: 134,
        config: 131,
        dynamic_lock: 130,
    };

    /// NTAG216
    pub const NTAG216: Self = Self {
        password: 229,
        pack: 230,
        config: 227,
        dynamic_lock: 226,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_blocks_skip_trailers() {
        let blocks: Vec<u8> = DataArea::new(4, 15).data_blocks().collect();
        assert_eq!(blocks, vec![4, 5, 6, 8, 9, 10, 12, 13, 14]);
    }

    #[test]
    fn test_area_bounds() {
        let area = DataArea::new(4, 39);
        assert_eq!(area.len(), 36);
        assert!(area.contains(4));
        assert!(area.contains(39));
        assert!(!area.contains(3));
        assert!(!area.contains(40));
    }
}
