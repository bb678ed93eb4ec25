//! MIFARE Classic sector authentication and block access
//!
//! Blocks are grouped in sectors: four blocks per sector below block 128, sixteen
//! above it (4K cards only). The last block of every sector is its trailer, holding
//! key A, the access conditions and key B. Every block access must be preceded by a
//! successful authentication against the trailer of the block's sector.
//!
//! ```text
//! load key    FF 82 00 00 06 <key>
//! authenticate FF 86 00 00 05 01 00 <trailer> <60|61> 00
//! ```

use std::fmt;

use derive_more::Display;
use tapkit_apdu_core::CardTransport;
use tracing::{debug, info, trace};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::commands;
use crate::constants::BLOCK_SIZE;
use crate::constants::classic::{DEFAULT_KEYS, KEY_A, KEY_B};
use crate::error::{Error, Result};
use crate::io;
use crate::types::{CardType, DataArea, SectorTrailer};

/// First block of the 16-block sectors
const LARGE_SECTOR_START: u8 = 128;
/// Number of 4-block sectors
const SMALL_SECTORS: u8 = 32;

/// Sector holding `block`
pub const fn sector_of(block: u8) -> u8 {
    if block < LARGE_SECTOR_START {
        block / 4
    } else {
        SMALL_SECTORS + (block - LARGE_SECTOR_START) / 16
    }
}

/// Trailer block of `sector`
///
/// Sectors run from 0 to 39; larger numbers do not exist on any Classic card.
pub const fn trailer_of(sector: u8) -> u8 {
    if sector < SMALL_SECTORS {
        sector * 4 + 3
    } else {
        LARGE_SECTOR_START + (sector - SMALL_SECTORS) * 16 + 15
    }
}

/// Whether `block` is the trailer of its sector
pub const fn is_sector_trailer(block: u8) -> bool {
    trailer_of(sector_of(block)) == block
}

/// Which of the two sector keys to authenticate with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum KeyType {
    /// Key A
    #[default]
    #[display("A")]
    A,
    /// Key B
    #[display("B")]
    B,
}

impl KeyType {
    /// Key selector byte of the general authenticate command
    pub const fn selector(self) -> u8 {
        match self {
            Self::A => KEY_A,
            Self::B => KEY_B,
        }
    }

    /// The other key slot
    pub const fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

/// A 6-byte MIFARE Classic sector key
///
/// The key is wiped from memory when dropped and never printed.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ClassicKey([u8; 6]);

impl ClassicKey {
    /// Key length in bytes
    pub const LEN: usize = 6;

    /// Wrap raw key bytes
    pub const fn new(key: [u8; 6]) -> Self {
        Self(key)
    }

    /// Key from a slice that must be exactly six bytes long
    pub fn from_slice(key: &[u8]) -> Result<Self> {
        key.try_into()
            .map(Self)
            .map_err(|_| Error::invalid_length("key", Self::LEN, key.len()))
    }

    /// Raw key bytes
    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl From<[u8; 6]> for ClassicKey {
    fn from(key: [u8; 6]) -> Self {
        Self(key)
    }
}

impl fmt::Debug for ClassicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClassicKey(..)")
    }
}

/// Authenticates sectors for one multi-block operation
///
/// With an explicit key only the requested key type is tried. Without one, every
/// default key is tried with the requested type and then the other type. The
/// authenticated sector is remembered, so consecutive blocks of one sector cost a
/// single authentication. The state dies with the operation.
#[derive(Debug)]
pub(crate) struct Authenticator {
    key: Option<ClassicKey>,
    key_type: KeyType,
    sector: Option<u8>,
}

impl Authenticator {
    pub(crate) const fn new(key: Option<ClassicKey>, key_type: KeyType) -> Self {
        Self {
            key,
            key_type,
            sector: None,
        }
    }

    /// Default keys, key A first
    pub(crate) const fn with_default_keys() -> Self {
        Self::new(None, KeyType::A)
    }

    /// Authenticate the sector of `block` unless it already is
    pub(crate) fn authenticate<T: CardTransport>(
        &mut self,
        transport: &mut T,
        block: u8,
    ) -> Result<()> {
        let sector = sector_of(block);
        if self.sector == Some(sector) {
            return Ok(());
        }
        self.sector = None;

        let trailer = trailer_of(sector);
        let authenticated = match &self.key {
            Some(key) => try_key(transport, key.as_bytes(), trailer, &[self.key_type]),
            None => {
                let order = [self.key_type, self.key_type.other()];
                DEFAULT_KEYS
                    .iter()
                    .any(|key| try_key(transport, key, trailer, &order))
            }
        };
        if !authenticated {
            return Err(Error::SectorAuthentication { sector });
        }

        debug!(sector, "Sector authenticated");
        self.sector = Some(sector);
        Ok(())
    }

    /// Authenticate, then read a block
    pub(crate) fn read_block<T: CardTransport>(
        &mut self,
        transport: &mut T,
        block: u8,
    ) -> Result<[u8; 16]> {
        self.authenticate(transport, block)?;
        io::read_block(transport, block)
    }

    /// Authenticate, then write a block
    pub(crate) fn write_block<T: CardTransport>(
        &mut self,
        transport: &mut T,
        block: u8,
        data: &[u8; 16],
    ) -> Result<()> {
        self.authenticate(transport, block)?;
        io::write_block(transport, block, data)
    }
}

/// Load `key` and try each key type against `trailer`
///
/// A rejected load skips the key without spending an authentication.
fn try_key<T: CardTransport>(
    transport: &mut T,
    key: &[u8; 6],
    trailer: u8,
    key_types: &[KeyType],
) -> bool {
    let loaded = transport
        .transmit(&commands::load_key(key))
        .is_ok_and(|response| response.status().is_completed());
    if !loaded {
        trace!(trailer, "Key load rejected");
        return false;
    }

    key_types.iter().any(|key_type| {
        transport
            .transmit(&commands::authenticate(trailer, key_type.selector()))
            .is_ok_and(|response| response.status().is_completed())
    })
}

pub(crate) fn ensure_data_block(block: u8) -> Result<()> {
    if is_sector_trailer(block) {
        return Err(Error::SectorTrailerBlock(block));
    }
    Ok(())
}

/// Read a data block
///
/// Sector trailers are refused before anything is sent to the card.
pub fn read_block<T: CardTransport>(
    transport: &mut T,
    block: u8,
    key: Option<ClassicKey>,
    key_type: KeyType,
) -> Result<[u8; 16]> {
    ensure_data_block(block)?;
    let data = Authenticator::new(key, key_type).read_block(transport, block)?;
    info!(block, data = %hex::encode(data), "MIFARE block read");
    Ok(data)
}

/// Write a data block
///
/// Sector trailers are refused before anything is sent to the card.
pub fn write_block<T: CardTransport>(
    transport: &mut T,
    block: u8,
    data: &[u8; 16],
    key: Option<ClassicKey>,
    key_type: KeyType,
) -> Result<()> {
    ensure_data_block(block)?;
    Authenticator::new(key, key_type).write_block(transport, block, data)?;
    info!(block, "MIFARE block written");
    Ok(())
}

/// Replace both keys of a sector, keeping its access conditions
///
/// The trailer is read back after authentication so the access bits written are
/// the ones already on the card.
pub fn write_sector_trailer<T: CardTransport>(
    transport: &mut T,
    block: u8,
    key_a: &ClassicKey,
    key_b: &ClassicKey,
    auth_key: Option<ClassicKey>,
    auth_key_type: KeyType,
) -> Result<()> {
    if !is_sector_trailer(block) {
        return Err(Error::NotSectorTrailer(block));
    }

    let mut authenticator = Authenticator::new(auth_key, auth_key_type);
    let current = SectorTrailer::from_block(&authenticator.read_block(transport, block)?);
    let trailer = current.with_keys(*key_a.as_bytes(), *key_b.as_bytes());
    authenticator.write_block(transport, block, &trailer.to_block())?;

    info!(
        block,
        access_bits = %hex::encode(trailer.access_bits),
        "Sector trailer updated"
    );
    Ok(())
}

/// Write `data` across the data blocks of `area`, padded to whole blocks
///
/// Trailers are skipped and every new sector is authenticated with the default keys.
/// The first sector no key opens ends the write.
pub(crate) fn write_data<T: CardTransport>(
    transport: &mut T,
    area: DataArea,
    data: &[u8],
) -> Result<()> {
    let mut authenticator = Authenticator::with_default_keys();
    let mut blocks = area.data_blocks();

    for chunk in data.chunks(BLOCK_SIZE) {
        let block = blocks.next().ok_or(Error::CapacityExceeded {
            size: data.len(),
            capacity: area.data_blocks().count() * BLOCK_SIZE,
            card_type: CardType::MifareClassic,
        })?;
        let mut buf = [0u8; BLOCK_SIZE];
        buf[..chunk.len()].copy_from_slice(chunk);
        authenticator.write_block(transport, block, &buf)?;
    }

    debug!(bytes = data.len(), "Classic data area written");
    Ok(())
}

/// Read the data blocks of `area` in order, handing each to `visit` until it returns
/// `false`
///
/// A block that fails to authenticate or read ends the scan without an error.
pub(crate) fn scan_data<T: CardTransport>(
    transport: &mut T,
    area: DataArea,
    mut visit: impl FnMut(&[u8; 16]) -> bool,
) {
    let mut authenticator = Authenticator::with_default_keys();
    for block in area.data_blocks() {
        match authenticator.read_block(transport, block) {
            Ok(data) => {
                if !visit(&data) {
                    return;
                }
            }
            Err(e) => {
                debug!(block, error = %e, "Classic scan stopped");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{EmulatedTag, ScriptedCard};

    const AUTH_FAILED: [u8; 2] = [0x63, 0x00];
    const OK: [u8; 2] = [0x90, 0x00];

    #[test]
    fn test_sector_math() {
        assert_eq!(sector_of(0), 0);
        assert_eq!(sector_of(7), 1);
        assert_eq!(sector_of(127), 31);
        assert_eq!(sector_of(128), 32);
        assert_eq!(sector_of(255), 39);

        assert_eq!(trailer_of(1), 7);
        assert_eq!(trailer_of(32), 143);
        assert_eq!(trailer_of(39), 255);

        let trailers: Vec<u8> = (0..=255).filter(|b| is_sector_trailer(*b)).collect();
        assert_eq!(trailers.len(), 40);
        assert_eq!(&trailers[..3], &[3, 7, 11]);
        assert!(is_sector_trailer(127));
        assert!(!is_sector_trailer(131));
        assert!(is_sector_trailer(159));
    }

    #[test]
    fn test_key_from_slice() {
        assert!(ClassicKey::from_slice(&[0xFF; 6]).is_ok());
        let error = ClassicKey::from_slice(&[0xFF; 5]).unwrap_err();
        assert!(matches!(
            error,
            Error::InvalidLength {
                expected: 6,
                actual: 5,
                ..
            }
        ));
        assert_eq!(format!("{:?}", ClassicKey::new([0xAB; 6])), "ClassicKey(..)");
    }

    #[test]
    fn test_default_keys_exhausted_after_eight_attempts() {
        let mut card = ScriptedCard::new(|command| {
            Ok(match command[1] {
                0x82 => OK.to_vec(),
                _ => AUTH_FAILED.to_vec(),
            })
        });

        let error = read_block(&mut card, 4, None, KeyType::A).unwrap_err();
        assert!(matches!(error, Error::SectorAuthentication { sector: 1 }));

        let sent = card.sent();
        let auths: Vec<&String> = sent.iter().filter(|c| c.starts_with("FF86")).collect();
        assert_eq!(auths.len(), 8);
        assert_eq!(auths[0], "FF860000050100076000");
        assert_eq!(auths[1], "FF860000050100076100");
        assert_eq!(sent.iter().filter(|c| c.starts_with("FF82")).count(), 4);
        assert!(!sent.iter().any(|c| c.starts_with("FFB0")));
    }

    #[test]
    fn test_explicit_key_single_attempt() {
        let mut card = ScriptedCard::new(|command| {
            Ok(match command[1] {
                0x82 => OK.to_vec(),
                _ => AUTH_FAILED.to_vec(),
            })
        });

        let key = ClassicKey::new([0x11; 6]);
        let error = read_block(&mut card, 5, Some(key), KeyType::B).unwrap_err();
        assert_eq!(error.kind(), crate::ErrorKind::Authentication);
        assert_eq!(
            card.sent(),
            ["FF82000006111111111111", "FF860000050100076100"]
        );
    }

    #[test]
    fn test_rejected_key_load_skips_key() {
        let mut card = ScriptedCard::new(|command| {
            Ok(match command {
                [0xFF, 0x82, .., 0xFF] => vec![0x69, 0x86],
                [0xFF, 0x82, ..] => OK.to_vec(),
                _ => AUTH_FAILED.to_vec(),
            })
        });

        assert!(read_block(&mut card, 4, None, KeyType::A).is_err());
        // the transport key never reaches an authenticate
        assert_eq!(card.sent().iter().filter(|c| c.starts_with("FF86")).count(), 6);
    }

    #[test]
    fn test_trailer_refused_without_transmit() {
        let mut card = ScriptedCard::new(|_| panic!("nothing may be sent"));

        assert!(matches!(
            read_block(&mut card, 7, None, KeyType::A),
            Err(Error::SectorTrailerBlock(7))
        ));
        assert!(matches!(
            write_block(&mut card, 63, &[0; 16], None, KeyType::A),
            Err(Error::SectorTrailerBlock(63))
        ));
        assert!(matches!(
            write_sector_trailer(
                &mut card,
                8,
                &ClassicKey::new([0; 6]),
                &ClassicKey::new([0; 6]),
                None,
                KeyType::A
            ),
            Err(Error::NotSectorTrailer(8))
        ));
        assert!(card.sent().is_empty());
    }

    #[test]
    fn test_block_roundtrip_on_emulated_card() {
        let mut tag = EmulatedTag::classic_1k();
        let data = *b"sixteen bytes!!!";

        write_block(&mut tag, 9, &data, None, KeyType::A).unwrap();
        assert_eq!(read_block(&mut tag, 9, None, KeyType::A).unwrap(), data);
        assert_eq!(tag.memory(9 * 16, 16), data);
    }

    #[test]
    fn test_falls_back_to_key_b() {
        let mut tag = EmulatedTag::classic_1k();
        tag.set_sector_keys(2, [0x42; 6], [0xD3, 0xF7, 0xD3, 0xF7, 0xD3, 0xF7]);

        read_block(&mut tag, 8, None, KeyType::A).unwrap();
        let log = tag.log();
        assert!(log.ends_with(&[
            "FF82000006D3F7D3F7D3F7".to_string(),
            "FF8600000501000B6000".to_string(),
            "FF8600000501000B6100".to_string(),
            "FFB0000810".to_string(),
        ]));
    }

    #[test]
    fn test_write_sector_trailer_keeps_access_bits() {
        let mut tag = EmulatedTag::classic_1k();
        tag.write_memory(7 * 16 + 6, &[0x7F, 0x07, 0x88, 0x40]);

        write_sector_trailer(
            &mut tag,
            7,
            &ClassicKey::new([0xA1; 6]),
            &ClassicKey::new([0xB1; 6]),
            Some(ClassicKey::new([0xFF; 6])),
            KeyType::A,
        )
        .unwrap();

        assert_eq!(
            hex::encode(tag.memory(7 * 16, 16)),
            "a1a1a1a1a1a17f078840b1b1b1b1b1b1"
        );

        // the old key no longer opens the sector
        assert!(read_block(&mut tag, 4, Some(ClassicKey::new([0xFF; 6])), KeyType::A).is_err());
        assert!(read_block(&mut tag, 4, Some(ClassicKey::new([0xA1; 6])), KeyType::A).is_ok());
    }

    #[test]
    fn test_bulk_write_skips_trailers_and_authenticates_per_sector() {
        let mut tag = EmulatedTag::classic_1k();
        let data: Vec<u8> = (0..50).collect();

        write_data(&mut tag, DataArea::new(4, 63), &data).unwrap();

        assert_eq!(tag.memory(4 * 16, 48), &data[..48]);
        let mut tail = vec![48, 49];
        tail.resize(16, 0);
        assert_eq!(tag.memory(8 * 16, 16), tail);
        // trailer of sector 1 untouched
        assert_eq!(
            hex::encode(tag.memory(7 * 16, 16)),
            "ffffffffffffff078069ffffffffffff"
        );
        assert_eq!(tag.auth_attempts(), 2);
    }

    #[test]
    fn test_bulk_write_stops_at_locked_sector() {
        let mut tag = EmulatedTag::classic_1k();
        tag.set_sector_keys(2, [0x42; 6], [0x43; 6]);

        let error = write_data(&mut tag, DataArea::new(4, 63), &[0xAA; 64]).unwrap_err();
        assert!(matches!(error, Error::SectorAuthentication { sector: 2 }));
        assert_eq!(tag.memory(4 * 16, 16), [0xAA; 16]);
    }

    #[test]
    fn test_scan_reads_until_visitor_stops() {
        let mut tag = EmulatedTag::classic_1k();
        tag.write_memory(4 * 16, &[1; 16]);
        tag.write_memory(5 * 16, &[2; 16]);

        let mut seen = Vec::new();
        scan_data(&mut tag, DataArea::new(4, 63), |block| {
            seen.push(block[0]);
            seen.len() < 2
        });
        assert_eq!(seen, [1, 2]);
    }
}
