//! Placement of the NDEF TLV in each family's data area
//!
//! | Family            | Data area                    | Notes                          |
//! |-------------------|------------------------------|--------------------------------|
//! | NTAG / Ultralight | pages from 4                 | ladder per page                |
//! | MIFARE Classic    | blocks 4..=63, no trailers   | default keys, per sector       |
//! | ISO 15693         | blocks from 1                | CC `E1 40 40 00` in block 0    |

use tapkit_apdu_core::CardTransport;
use tapkit_ndef::tlv::{self, TlvScan};
use tapkit_ndef::{NdefContent, NdefMessage};
use tracing::{debug, info};

use crate::classic;
use crate::constants::ISO15693_CC;
use crate::error::{Error, Result};
use crate::io::{self, SCAN_READ_LEN};
use crate::types::{AddressScheme, CardProfile};

/// Write an already framed TLV to the data area of `profile`
///
/// The TLV must fit the family's user area; nothing is written otherwise.
pub fn write_tlv<T: CardTransport>(
    transport: &mut T,
    profile: &CardProfile,
    tlv: &[u8],
) -> Result<()> {
    let capacity = profile.capacity();
    if tlv.len() > capacity {
        return Err(Error::CapacityExceeded {
            size: tlv.len(),
            capacity,
            card_type: profile.card_type,
        });
    }

    let area = profile.user_area();
    match profile.card_type.scheme() {
        AddressScheme::Type2Pages => io::write_pages(transport, area.first, tlv)?,
        AddressScheme::ClassicBlocks => classic::write_data(transport, area, tlv)?,
        AddressScheme::VicinityBlocks => {
            io::write_page(transport, 0, &ISO15693_CC)?;
            io::write_pages(transport, area.first, tlv)?;
        }
    }

    info!(card_type = %profile.card_type, bytes = tlv.len(), "NDEF data written");
    Ok(())
}

/// Encode, frame and write a message
pub fn write_message<T: CardTransport>(
    transport: &mut T,
    profile: &CardProfile,
    message: &NdefMessage,
) -> Result<()> {
    let tlv = tlv::wrap(&message.to_bytes()?)?;
    write_tlv(transport, profile, &tlv)
}

/// Replace the stored message with an empty one
pub fn erase<T: CardTransport>(transport: &mut T, profile: &CardProfile) -> Result<()> {
    write_tlv(transport, profile, &tlv::EMPTY_NDEF)
}

/// Whether enough of the data area has been read to stop
fn scan_finished(dump: &[u8]) -> bool {
    !matches!(tlv::scan(dump), TlvScan::Incomplete)
}

/// Read the data area until the NDEF TLV is complete, the area turns out not to
/// hold one, or a read fails
fn read_data_area<T: CardTransport>(transport: &mut T, profile: &CardProfile) -> Vec<u8> {
    let area = profile.ndef_read_area();
    let mut dump = Vec::new();

    match profile.card_type.scheme() {
        AddressScheme::ClassicBlocks => classic::scan_data(transport, area, |block| {
            dump.extend_from_slice(block);
            !scan_finished(&dump)
        }),
        AddressScheme::Type2Pages | AddressScheme::VicinityBlocks => {
            for page in area.addresses() {
                match io::read_page(transport, page, SCAN_READ_LEN) {
                    Ok(data) => dump.extend_from_slice(&data),
                    Err(e) => {
                        debug!(page, error = %e, "NDEF scan stopped");
                        break;
                    }
                }
                if scan_finished(&dump) {
                    break;
                }
            }
        }
    }

    dump
}

/// Read and decode the stored NDEF message
///
/// Returns `None` when the tag holds no message, an empty one, or one that does not
/// decode.
pub fn read_content<T: CardTransport>(
    transport: &mut T,
    profile: &CardProfile,
) -> Option<NdefContent> {
    let dump = read_data_area(transport, profile);
    let TlvScan::Complete(message) = tlv::scan(&dump) else {
        debug!(bytes = dump.len(), "No complete NDEF TLV found");
        return None;
    };

    match NdefContent::decode(message) {
        Ok(content) if !content.is_empty() => Some(content),
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "Stored NDEF message does not decode");
            None
        }
    }
}
