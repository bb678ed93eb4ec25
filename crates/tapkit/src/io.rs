//! Page and block access through the reader
//!
//! Readers disagree on how native Type 2 commands reach the tag, so every page read
//! or write walks an ordered ladder of methods. The first method that produces a
//! recognised success ends the ladder for that page. Failures of a method, transport
//! errors included, hand over to the next one; only a card error reported inside a
//! communicate-thru reply stops the ladder early.

use tapkit_apdu_core::{CardTransport, Command, Response};
use tracing::{debug, trace};

use crate::commands;
use crate::constants::{BLOCK_SIZE, PAGE_SIZE, native, pn53x, transparent};
use crate::error::{Error, Result};

/// READ BINARY length used when reading a single page for the caller
pub const PAGE_READ_LEN: u8 = 0x10;
/// READ BINARY length used when scanning the NDEF area
pub const SCAN_READ_LEN: u8 = PAGE_SIZE as u8;

/// Shortest communicate-thru READ reply accepted: `D5 43 00` and fourteen data bytes
const COMMUNICATE_THRU_READ_MIN: usize = 17;

/// Ways of writing one page, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMethod {
    /// Native `A2` sent as is, for readers that pass raw frames through
    Native,
    /// UPDATE BINARY
    Binary,
    /// Native `A2` inside PN53x InCommunicateThru
    CommunicateThru,
    /// Native `A2` inside a transparent exchange session
    Transparent,
}

/// Ways of reading one page, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMethod {
    /// READ BINARY
    Binary,
    /// Native `30` inside PN53x InCommunicateThru
    CommunicateThru,
    /// Native `30` inside a transparent exchange session
    Transparent,
}

/// Page write ladder
pub const WRITE_LADDER: [WriteMethod; 4] = [
    WriteMethod::Native,
    WriteMethod::Binary,
    WriteMethod::CommunicateThru,
    WriteMethod::Transparent,
];

/// Page read ladder
pub const READ_LADDER: [ReadMethod; 3] = [
    ReadMethod::Binary,
    ReadMethod::CommunicateThru,
    ReadMethod::Transparent,
];

/// Outcome of one method of a ladder
#[derive(Debug)]
enum Rung<T> {
    /// The method worked
    Done(T),
    /// The method is not available on this reader or card; try the next one
    Fallthrough,
    /// The tag refused the command; stop the ladder
    Abort(Error),
}

/// Send a command, folding transport and framing errors into a fallthrough
fn exchange<T: CardTransport>(
    transport: &mut T,
    command: &Command,
) -> Option<Response> {
    match transport.transmit(command) {
        Ok(response) => Some(response),
        Err(e) => {
            debug!(command = %command, error = %e, "Exchange failed");
            None
        }
    }
}

/// Write one page, walking the full ladder
pub fn write_page<T: CardTransport>(transport: &mut T, page: u8, data: &[u8; 4]) -> Result<()> {
    for method in WRITE_LADDER {
        let rung = match method {
            WriteMethod::Native => write_native(transport, page, data),
            WriteMethod::Binary => write_binary(transport, page, data),
            WriteMethod::CommunicateThru => write_communicate_thru(transport, page, data),
            WriteMethod::Transparent => write_transparent(transport, page, data),
        };
        match rung {
            Rung::Done(()) => {
                debug!(page, data = %hex::encode(data), ?method, "Page written");
                return Ok(());
            }
            Rung::Fallthrough => trace!(page, ?method, "Write method did not apply"),
            Rung::Abort(e) => return Err(e),
        }
    }

    Err(Error::NoMethodWorked {
        operation: "write",
        unit: "page",
        address: page,
    })
}

/// Write consecutive pages from `start_page`, padding the last one with zeros
pub fn write_pages<T: CardTransport>(transport: &mut T, start_page: u8, data: &[u8]) -> Result<()> {
    for (index, chunk) in data.chunks(PAGE_SIZE).enumerate() {
        let page = page_offset(start_page, index)?;
        let mut buf = [0u8; PAGE_SIZE];
        buf[..chunk.len()].copy_from_slice(chunk);
        write_page(transport, page, &buf)?;
    }
    Ok(())
}

/// Page `index` positions after `start`, refusing to wrap past 255
pub(crate) fn page_offset(start: u8, index: usize) -> Result<u8> {
    u8::try_from(index)
        .ok()
        .and_then(|index| start.checked_add(index))
        .ok_or_else(|| Error::InvalidInput {
            field: "page",
            reason: format!("page {start} + {index} is beyond page 255"),
        })
}

fn write_native<T: CardTransport>(transport: &mut T, page: u8, data: &[u8; 4]) -> Rung<()> {
    match transport.transmit_raw(&commands::native_write(page, data)) {
        Ok(raw) if raw.first() == Some(&native::ACK) || raw.ends_with(&[0x90, 0x00]) => {
            Rung::Done(())
        }
        _ => Rung::Fallthrough,
    }
}

fn write_binary<T: CardTransport>(transport: &mut T, page: u8, data: &[u8; 4]) -> Rung<()> {
    match exchange(transport, &commands::update_binary(page, data)) {
        Some(response) if response.is_success() => Rung::Done(()),
        Some(response) => {
            debug!(page, status = %response.status(), "UPDATE BINARY rejected");
            Rung::Fallthrough
        }
        None => Rung::Fallthrough,
    }
}

/// Status byte of a `D5 43 <status> ...` frame, if the payload is one
fn communicate_thru_status(payload: &[u8]) -> Option<u8> {
    match payload {
        [h0, h1, status, ..] if [*h0, *h1] == pn53x::IN_COMMUNICATE_THRU_RESPONSE => {
            Some(*status)
        }
        _ => None,
    }
}

fn write_communicate_thru<T: CardTransport>(
    transport: &mut T,
    page: u8,
    data: &[u8; 4],
) -> Rung<()> {
    let command = commands::communicate_thru(&commands::native_write(page, data));
    match exchange(transport, &command) {
        Some(response) if response.is_success() => {
            match communicate_thru_status(response.payload()) {
                Some(code) if code != 0x00 => Rung::Abort(Error::CardError {
                    operation: "write",
                    page,
                    code,
                }),
                _ => Rung::Done(()),
            }
        }
        _ => Rung::Fallthrough,
    }
}

/// Run a native command inside a transparent exchange session
///
/// The session is always closed again, also when switching protocol fails. Returns
/// the transceive response when every step completed.
fn transparent_session<T: CardTransport>(
    transport: &mut T,
    native_command: &[u8],
) -> Option<Response> {
    let started = exchange(transport, &commands::start_session())?;
    if !started.status().is_completed() {
        return None;
    }

    let switched = exchange(transport, &commands::switch_to_iso14443a());
    if !switched.is_some_and(|r| r.status().is_completed()) {
        let _ = exchange(transport, &commands::end_session());
        return None;
    }

    let response = exchange(transport, &commands::transceive(native_command));
    let _ = exchange(transport, &commands::end_session());
    response.filter(|r| r.status().is_completed())
}

fn write_transparent<T: CardTransport>(transport: &mut T, page: u8, data: &[u8; 4]) -> Rung<()> {
    // A session left open by an earlier failure blocks the start
    let _ = exchange(transport, &commands::end_session());
    match transparent_session(transport, &commands::native_write(page, data)) {
        Some(_) => Rung::Done(()),
        None => Rung::Fallthrough,
    }
}

/// Read one page, walking the full ladder
///
/// `len` is the READ BINARY length of the first method; only the first four bytes of
/// the answer are kept whatever the method.
pub fn read_page<T: CardTransport>(transport: &mut T, page: u8, len: u8) -> Result<[u8; 4]> {
    for method in READ_LADDER {
        let rung = match method {
            ReadMethod::Binary => read_binary(transport, page, len),
            ReadMethod::CommunicateThru => read_communicate_thru(transport, page),
            ReadMethod::Transparent => read_transparent(transport, page),
        };
        match rung {
            Rung::Done(data) => {
                trace!(page, data = %hex::encode(data), ?method, "Page read");
                return Ok(data);
            }
            Rung::Fallthrough => trace!(page, ?method, "Read method did not apply"),
            Rung::Abort(e) => return Err(e),
        }
    }

    Err(Error::NoMethodWorked {
        operation: "read",
        unit: "page",
        address: page,
    })
}

fn first_page(bytes: &[u8]) -> Option<[u8; 4]> {
    bytes.get(..PAGE_SIZE)?.try_into().ok()
}

fn read_binary<T: CardTransport>(transport: &mut T, page: u8, len: u8) -> Rung<[u8; 4]> {
    match exchange(transport, &commands::read_binary(page, len)) {
        Some(response) if response.is_success() => {
            first_page(response.payload()).map_or(Rung::Fallthrough, Rung::Done)
        }
        _ => Rung::Fallthrough,
    }
}

fn read_communicate_thru<T: CardTransport>(transport: &mut T, page: u8) -> Rung<[u8; 4]> {
    let command = commands::communicate_thru(&commands::native_read(page));
    let Some(response) = exchange(transport, &command) else {
        return Rung::Fallthrough;
    };
    let payload = response.payload();
    if response.is_success()
        && payload.len() >= COMMUNICATE_THRU_READ_MIN
        && communicate_thru_status(payload) == Some(0x00)
    {
        first_page(&payload[3..]).map_or(Rung::Fallthrough, Rung::Done)
    } else {
        Rung::Fallthrough
    }
}

/// Value of the first response data object holding at least a page
fn response_data(payload: &[u8]) -> Option<&[u8]> {
    payload.iter().enumerate().find_map(|(index, &tag)| {
        if tag != transparent::RESPONSE_DATA {
            return None;
        }
        let len = usize::from(*payload.get(index + 1)?);
        let value = payload.get(index + 2..index + 2 + len)?;
        (len >= PAGE_SIZE).then_some(value)
    })
}

fn read_transparent<T: CardTransport>(transport: &mut T, page: u8) -> Rung<[u8; 4]> {
    transparent_session(transport, &commands::native_read(page))
        .as_ref()
        .and_then(|response| response_data(response.payload()))
        .and_then(first_page)
        .map_or(Rung::Fallthrough, Rung::Done)
}

/// Read a 16-byte MIFARE Classic block; the sector must already be authenticated
pub fn read_block<T: CardTransport>(transport: &mut T, block: u8) -> Result<[u8; 16]> {
    let response = transport.transmit(&commands::read_binary(block, BLOCK_SIZE as u8))?;
    if !response.is_success() {
        return Err(Error::Status {
            operation: "read block",
            status: response.status(),
        });
    }
    response
        .payload()
        .get(..BLOCK_SIZE)
        .and_then(|data| data.try_into().ok())
        .ok_or(Error::Status {
            operation: "read block",
            status: response.status(),
        })
}

/// Write a 16-byte MIFARE Classic block; the sector must already be authenticated
pub fn write_block<T: CardTransport>(transport: &mut T, block: u8, data: &[u8; 16]) -> Result<()> {
    let response = transport.transmit(&commands::update_binary(block, data))?;
    if !response.is_success() {
        return Err(Error::Status {
            operation: "write block",
            status: response.status(),
        });
    }
    debug!(block, "Block written");
    Ok(())
}
