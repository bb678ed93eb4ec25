//! Test doubles for readers and tags

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use tapkit_apdu_core::{CardConnector, CardTransport, TransportError};

use crate::classic::{sector_of, trailer_of};
use crate::types::PasswordLayout;

pub(crate) const NTAG_ATR: &str = "3b8f8001804f0ca0000003060300030000000068";
pub(crate) const CLASSIC_ATR: &str = "3b8f8001804f0ca000000306030001000000006a";
pub(crate) const ISO15693_ATR: &str = "3b8f8001804f0ca0000003060b00140000000077";

pub(crate) const NTAG_UID: &str = "0442488a837280";
pub(crate) const CLASSIC_UID: &str = "932bae0e";
pub(crate) const ICODE_UID: &str = "80391566080104e0";

const OK: [u8; 2] = [0x90, 0x00];

fn decode(raw: &str) -> Vec<u8> {
    hex::decode(raw).expect("valid fixture hex")
}

type Responder = Box<dyn FnMut(&[u8]) -> Result<Vec<u8>, TransportError> + Send>;

/// Transport answering every command through a closure
pub(crate) struct ScriptedCard {
    responder: Responder,
    commands: Vec<Bytes>,
    atr: Bytes,
}

impl ScriptedCard {
    pub(crate) fn new(
        responder: impl FnMut(&[u8]) -> Result<Vec<u8>, TransportError> + Send + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            commands: Vec::new(),
            atr: Bytes::from(decode(NTAG_ATR)),
        }
    }

    pub(crate) fn with_atr(mut self, atr: &str) -> Self {
        self.atr = Bytes::from(decode(atr));
        self
    }

    /// Commands sent so far, upper-case hex
    pub(crate) fn sent(&self) -> Vec<String> {
        self.commands.iter().map(hex::encode_upper).collect()
    }
}

impl fmt::Debug for ScriptedCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedCard")
            .field("commands", &self.commands.len())
            .finish_non_exhaustive()
    }
}

impl CardTransport for ScriptedCard {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        self.commands.push(Bytes::copy_from_slice(command));
        (self.responder)(command).map(Bytes::from)
    }

    fn atr(&self) -> Result<Bytes, TransportError> {
        Ok(self.atr.clone())
    }

    fn is_connected(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Memory {
    /// 4-byte pages with optional GET_VERSION support
    Type2,
    /// 16-byte blocks behind sector keys
    Classic,
    /// 4-byte blocks
    Vicinity,
}

#[derive(Debug)]
struct TagState {
    memory_kind: Memory,
    uid: Vec<u8>,
    atr: Vec<u8>,
    memory: Vec<u8>,
    version: Option<[u8; 8]>,
    password: Option<PasswordLayout>,
    loaded_key: Option<[u8; 6]>,
    authenticated_sector: Option<u8>,
    password_verified: bool,
    log: Vec<String>,
}

/// Memory-backed tag behind a reader that speaks READ/UPDATE BINARY, GET_VERSION,
/// PWD_AUTH and MIFARE key authentication
///
/// Clones share the same tag, so every session handed out by [`MockConnector`]
/// sees the writes of earlier ones.
#[derive(Debug, Clone)]
pub(crate) struct EmulatedTag {
    state: Arc<Mutex<TagState>>,
}

impl EmulatedTag {
    fn new(memory_kind: Memory, uid: &str, atr: &str, len: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(TagState {
                memory_kind,
                uid: decode(uid),
                atr: decode(atr),
                memory: vec![0; len],
                version: None,
                password: None,
                loaded_key: None,
                authenticated_sector: None,
                password_verified: false,
                log: Vec::new(),
            })),
        }
    }

    fn ntag(storage: u8, cc_size: u8, pages: usize, layout: PasswordLayout) -> Self {
        let tag = Self::new(Memory::Type2, NTAG_UID, NTAG_ATR, pages * 4);
        {
            let mut state = tag.lock();
            state.version = Some([0x00, 0x04, 0x04, 0x02, 0x01, 0x00, storage, 0x03]);
            state.password = Some(layout);
            state.memory[..8].copy_from_slice(&decode("0442488a837280d6"));
            state.memory[12..16].copy_from_slice(&[0xE1, 0x10, cc_size, 0x00]);
            // AUTH0 off, default password
            let config = usize::from(layout.config) * 4;
            state.memory[config + 3] = 0xFF;
            let pwd = usize::from(layout.password) * 4;
            state.memory[pwd..pwd + 4].copy_from_slice(&[0xFF; 4]);
        }
        tag
    }

    pub(crate) fn ntag213() -> Self {
        Self::ntag(0x0F, 0x12, 45, PasswordLayout::NTAG213)
    }

    pub(crate) fn ntag215() -> Self {
        Self::ntag(0x11, 0x3E, 135, PasswordLayout::NTAG215)
    }

    pub(crate) fn ntag216() -> Self {
        Self::ntag(0x13, 0x6D, 231, PasswordLayout::NTAG216)
    }

    /// Plain Ultralight: no GET_VERSION and no capability container yet
    pub(crate) fn ultralight() -> Self {
        Self::new(Memory::Type2, NTAG_UID, NTAG_ATR, 16 * 4)
    }

    /// MIFARE Classic 1K with transport keys in every trailer
    pub(crate) fn classic_1k() -> Self {
        let tag = Self::new(Memory::Classic, CLASSIC_UID, CLASSIC_ATR, 64 * 16);
        {
            let mut state = tag.lock();
            for sector in 0..16usize {
                let trailer = (sector * 4 + 3) * 16;
                state.memory[trailer..trailer + 16]
                    .copy_from_slice(&decode("ffffffffffffff078069ffffffffffff"));
            }
            state.memory[..4].copy_from_slice(&decode(CLASSIC_UID));
        }
        tag
    }

    pub(crate) fn icode_slix() -> Self {
        Self::new(Memory::Vicinity, ICODE_UID, ISO15693_ATR, 80 * 4)
    }

    fn lock(&self) -> MutexGuard<'_, TagState> {
        self.state.lock().expect("tag state poisoned")
    }

    /// Replace the key A and B of a sector trailer
    pub(crate) fn set_sector_keys(&self, sector: u8, key_a: [u8; 6], key_b: [u8; 6]) {
        let mut state = self.lock();
        let trailer = usize::from(trailer_of(sector)) * 16;
        state.memory[trailer..trailer + 6].copy_from_slice(&key_a);
        state.memory[trailer + 10..trailer + 16].copy_from_slice(&key_b);
    }

    /// Bytes of memory starting at a page (or block) offset
    pub(crate) fn memory(&self, offset: usize, len: usize) -> Vec<u8> {
        self.lock().memory[offset..offset + len].to_vec()
    }

    pub(crate) fn write_memory(&self, offset: usize, data: &[u8]) {
        self.lock().memory[offset..offset + data.len()].copy_from_slice(data);
    }

    /// Commands received so far, upper-case hex
    pub(crate) fn log(&self) -> Vec<String> {
        self.lock().log.clone()
    }

    pub(crate) fn clear_log(&self) {
        self.lock().log.clear();
    }

    /// Number of GENERAL AUTHENTICATE commands received
    pub(crate) fn auth_attempts(&self) -> usize {
        self.lock()
            .log
            .iter()
            .filter(|command| command.starts_with("FF86"))
            .count()
    }
}

impl TagState {
    const fn unit(&self) -> usize {
        match self.memory_kind {
            Memory::Classic => 16,
            Memory::Type2 | Memory::Vicinity => 4,
        }
    }

    fn respond(&mut self, command: &[u8]) -> Vec<u8> {
        match command {
            [0xFF, 0xCA, 0x00, 0x00, 0x00] => [self.uid.as_slice(), &OK[..]].concat(),
            [0xFF, 0x00, 0x00, 0x00, 0x02, 0x60, 0x00] | [0xFF, 0x00, 0x00, 0x00, 0x01, 0x60] => {
                match self.version {
                    Some(version) => [&version[..], &OK[..]].concat(),
                    None if self.memory_kind == Memory::Type2 => vec![0x69, 0x00],
                    None => vec![0x6A, 0x81],
                }
            }
            [0xFF, 0x00, 0x00, 0x00, 0x07, 0xD4, 0x42, 0x1B, pwd @ ..] => self.pwd_auth(pwd),
            [0xFF, 0xB0, 0x00, address, len] => self.read(*address, usize::from(*len)),
            [0xFF, 0xD6, 0x00, address, len, data @ ..] if usize::from(*len) == data.len() => {
                self.write(*address, data)
            }
            [0xFF, 0x82, 0x00, 0x00, 0x06, key @ ..] => match <[u8; 6]>::try_from(key) {
                Ok(key) => {
                    self.loaded_key = Some(key);
                    OK.to_vec()
                }
                Err(_) => vec![0x67, 0x00],
            },
            [0xFF, 0x86, 0x00, 0x00, 0x05, 0x01, 0x00, block, key_type, 0x00] => {
                self.authenticate(*block, *key_type)
            }
            [0xFF, 0x00, ..] | [0xFF, 0xC2, ..] => vec![0x6A, 0x81],
            [0xFF, ..] => vec![0x6D, 0x00],
            // raw frames are not passed through
            _ => vec![0x6E, 0x00],
        }
    }

    fn pwd_auth(&mut self, pwd: &[u8]) -> Vec<u8> {
        let Some(layout) = self.password else {
            return vec![0x6A, 0x81];
        };
        let stored = usize::from(layout.password) * 4;
        if self.memory[stored..stored + 4] == *pwd {
            self.password_verified = true;
            let pack = usize::from(layout.pack) * 4;
            [&[0xD5u8, 0x43, 0x00][..], &self.memory[pack..pack + 2], &OK[..]].concat()
        } else {
            vec![0xD5, 0x43, 0x01, 0x90, 0x00]
        }
    }

    fn read(&self, address: u8, len: usize) -> Vec<u8> {
        let offset = usize::from(address) * self.unit();
        if offset >= self.memory.len() {
            return vec![0x6A, 0x82];
        }
        if self.memory_kind == Memory::Classic
            && self.authenticated_sector != Some(sector_of(address))
        {
            return vec![0x69, 0x82];
        }
        let mut data = vec![0u8; len];
        let available = (self.memory.len() - offset).min(len);
        data[..available].copy_from_slice(&self.memory[offset..offset + available]);
        if self.memory_kind == Memory::Classic && (address + 1) % 4 == 0 {
            // key A never reads back
            data[..6].fill(0);
        }
        data.extend_from_slice(&OK);
        data
    }

    fn is_write_protected(&self, page: u8) -> bool {
        let Some(layout) = self.password else {
            return false;
        };
        let config = usize::from(layout.config) * 4;
        let auth0 = self.memory[config + 3];
        let static_lock = self.memory[10] == 0xFF && self.memory[11] == 0xFF;
        let dynamic = usize::from(layout.dynamic_lock) * 4;
        let dynamic_lock = self.memory[dynamic..dynamic + 3] == [0xFF; 3];

        (page >= auth0 && !self.password_verified)
            || (static_lock && (3..16).contains(&page))
            || (dynamic_lock && page >= 16 && page < layout.dynamic_lock)
    }

    fn write(&mut self, address: u8, data: &[u8]) -> Vec<u8> {
        let unit = self.unit();
        let offset = usize::from(address) * unit;
        if data.len() != unit {
            return vec![0x67, 0x00];
        }
        if offset + unit > self.memory.len() {
            return vec![0x6A, 0x82];
        }
        match self.memory_kind {
            Memory::Classic if address == 0 => return vec![0x63, 0x00],
            Memory::Classic if self.authenticated_sector != Some(sector_of(address)) => {
                return vec![0x69, 0x82];
            }
            Memory::Type2 if address < 2 || self.is_write_protected(address) => {
                return vec![0x63, 0x00];
            }
            _ => {}
        }
        self.memory[offset..offset + unit].copy_from_slice(data);
        OK.to_vec()
    }

    fn authenticate(&mut self, block: u8, key_type: u8) -> Vec<u8> {
        self.authenticated_sector = None;
        let Some(loaded) = self.loaded_key else {
            return vec![0x69, 0x86];
        };
        if self.memory_kind != Memory::Classic {
            return vec![0x63, 0x00];
        }
        let trailer = usize::from(trailer_of(sector_of(block))) * 16;
        let key = match key_type {
            0x60 => &self.memory[trailer..trailer + 6],
            0x61 => &self.memory[trailer + 10..trailer + 16],
            _ => return vec![0x6B, 0x00],
        };
        if key == loaded {
            self.authenticated_sector = Some(sector_of(block));
            OK.to_vec()
        } else {
            vec![0x63, 0x00]
        }
    }
}

impl CardTransport for EmulatedTag {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        let mut state = self.lock();
        state.log.push(hex::encode_upper(command));
        Ok(Bytes::from(state.respond(command)))
    }

    fn atr(&self) -> Result<Bytes, TransportError> {
        Ok(Bytes::from(self.lock().atr.clone()))
    }

    fn is_connected(&self) -> bool {
        true
    }
}

/// Connector handing out sessions on one emulated tag
///
/// Each session starts unauthenticated, as a fresh connection to a real tag would.
#[derive(Debug, Clone)]
pub(crate) struct MockConnector {
    tag: Option<EmulatedTag>,
}

impl MockConnector {
    pub(crate) const fn new(tag: EmulatedTag) -> Self {
        Self { tag: Some(tag) }
    }

    /// Connector whose reader never has a card
    pub(crate) const fn empty() -> Self {
        Self { tag: None }
    }
}

impl CardConnector for MockConnector {
    type Transport = EmulatedTag;

    fn connect(&self, reader: &str) -> Result<EmulatedTag, TransportError> {
        let tag = self
            .tag
            .clone()
            .ok_or_else(|| TransportError::NoCard(reader.to_string()))?;
        {
            let mut state = tag.lock();
            state.loaded_key = None;
            state.authenticated_sector = None;
            state.password_verified = false;
        }
        Ok(tag)
    }
}
