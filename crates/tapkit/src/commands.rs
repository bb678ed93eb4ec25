//! Builders for the pseudo-APDUs understood by PC/SC contactless readers

use bytes::{BufMut, BytesMut};
use tapkit_apdu_core::Command;
use tapkit_apdu_core::command::PSEUDO_CLA;

use crate::constants::{classic, ins, native, pn53x, transparent};

/// GET DATA for the card UID (`FF CA 00 00 00`)
pub(crate) const fn get_uid() -> Command {
    Command::new_with_le(PSEUDO_CLA, ins::GET_DATA, 0x00, 0x00, 0x00)
}

/// GET_VERSION passed through with a trailing zero (`FF 00 00 00 02 60 00`)
pub(crate) fn get_version() -> Command {
    direct_transmit(&[native::GET_VERSION, 0x00])
}

/// GET_VERSION without the trailing byte (`FF 00 00 00 01 60`)
pub(crate) fn get_version_short() -> Command {
    direct_transmit(&[native::GET_VERSION])
}

/// READ BINARY of `len` bytes from a page or block
pub(crate) const fn read_binary(address: u8, len: u8) -> Command {
    Command::new_with_le(PSEUDO_CLA, ins::READ_BINARY, 0x00, address, len)
}

/// UPDATE BINARY of a page or block
pub(crate) fn update_binary(address: u8, data: &[u8]) -> Command {
    Command::new_with_data(
        PSEUDO_CLA,
        ins::UPDATE_BINARY,
        0x00,
        address,
        BytesMut::from(data).freeze(),
    )
}

/// LOAD KEY into the volatile slot
pub(crate) fn load_key(key: &[u8; 6]) -> Command {
    Command::new_with_data(
        PSEUDO_CLA,
        ins::LOAD_KEY,
        0x00,
        classic::KEY_SLOT,
        BytesMut::from(&key[..]).freeze(),
    )
}

/// GENERAL AUTHENTICATE of `block` with the loaded key as key A or B
pub(crate) fn authenticate(block: u8, key_selector: u8) -> Command {
    Command::new_with_data(
        PSEUDO_CLA,
        ins::GENERAL_AUTHENTICATE,
        0x00,
        0x00,
        vec![
            classic::AUTH_VERSION,
            0x00,
            block,
            key_selector,
            classic::KEY_SLOT,
        ],
    )
}

/// Wrap bytes in a direct transmit (`FF 00 00 00 Lc ...`)
fn direct_transmit(data: &[u8]) -> Command {
    Command::new_with_data(
        PSEUDO_CLA,
        ins::DIRECT_TRANSMIT,
        0x00,
        0x00,
        BytesMut::from(data).freeze(),
    )
}

/// Native tag command through the PN53x InCommunicateThru (`D4 42 ...`)
pub(crate) fn communicate_thru(native_command: &[u8]) -> Command {
    let mut data = BytesMut::with_capacity(2 + native_command.len());
    data.put_slice(&pn53x::IN_COMMUNICATE_THRU);
    data.put_slice(native_command);
    direct_transmit(&data)
}

/// PWD_AUTH through InCommunicateThru
pub(crate) fn pwd_auth(password: &[u8; 4]) -> Command {
    let mut native_command = [0u8; 5];
    native_command[0] = native::PWD_AUTH;
    native_command[1..].copy_from_slice(password);
    communicate_thru(&native_command)
}

/// Native WRITE of one page (`A2 <page> <4 bytes>`)
pub(crate) const fn native_write(page: u8, data: &[u8; 4]) -> [u8; 6] {
    [native::WRITE, page, data[0], data[1], data[2], data[3]]
}

/// Native READ of four pages (`30 <page>`)
pub(crate) const fn native_read(page: u8) -> [u8; 2] {
    [native::READ, page]
}

fn transparent_exchange(p2: u8, data: &[u8]) -> Command {
    Command::new_with_data(
        PSEUDO_CLA,
        ins::TRANSPARENT_EXCHANGE,
        0x00,
        p2,
        BytesMut::from(data).freeze(),
    )
}

/// Open a transparent exchange session
pub(crate) fn start_session() -> Command {
    transparent_exchange(transparent::P2_MANAGE_SESSION, &transparent::START_SESSION)
}

/// Close a transparent exchange session
pub(crate) fn end_session() -> Command {
    transparent_exchange(transparent::P2_MANAGE_SESSION, &transparent::END_SESSION)
}

/// Switch the session to ISO 14443-A layer 3 framing
pub(crate) fn switch_to_iso14443a() -> Command {
    transparent_exchange(
        transparent::P2_SWITCH_PROTOCOL,
        &transparent::ISO14443A_LAYER3,
    )
}

/// Send a native command inside the transparent session (`95 <n> <command>`)
pub(crate) fn transceive(native_command: &[u8]) -> Command {
    let mut data = BytesMut::with_capacity(2 + native_command.len());
    data.put_u8(transparent::TRANSCEIVE);
    data.put_u8(native_command.len() as u8);
    data.put_slice(native_command);
    transparent_exchange(transparent::P2_TRANSCEIVE, &data)
}
