//! Ultralight and NTAG21x page access, password protection and locking
//!
//! NTAG21x tags guard pages from AUTH0 onwards with a 4-byte password. A session
//! unlocks them with `PWD_AUTH`, which the tag answers with its 2-byte PACK. The
//! password, PACK and AUTH0 live in configuration pages at the end of memory (see
//! [`PasswordLayout`]).

use tapkit_apdu_core::CardTransport;
use tracing::{debug, info, warn};

use crate::commands;
use crate::constants::{AUTH0_DISABLED, DYNAMIC_LOCK_ALL, FIRST_USER_PAGE, pn53x};
use crate::error::{Error, Result};
use crate::io::{self, PAGE_READ_LEN, SCAN_READ_LEN};
use crate::types::{PageWrite, PageWriteResult, PasswordLayout};

/// NTAG21x password
pub type Password = [u8; 4];
/// Password acknowledge returned by a successful `PWD_AUTH`
pub type Pack = [u8; 2];

/// Page holding the static lock bytes
const STATIC_LOCK_PAGE: u8 = 2;

/// Unlock password protected pages for the rest of the session
///
/// The reader must report 90 00, and a communicate-thru reply must carry a zero
/// status byte.
pub fn authenticate<T: CardTransport>(transport: &mut T, password: &Password) -> Result<()> {
    let response = transport.transmit(&commands::pwd_auth(password))?;
    let tag_accepted = response
        .payload()
        .strip_prefix(&pn53x::IN_COMMUNICATE_THRU_RESPONSE[..])
        .is_none_or(|rest| rest.first() == Some(&0x00));

    if !response.is_success() || !tag_accepted {
        return Err(Error::PasswordAuthentication);
    }
    debug!("Ultralight authenticated");
    Ok(())
}

pub(crate) fn ensure_user_page(page: u8) -> Result<()> {
    if page < FIRST_USER_PAGE {
        return Err(Error::SystemPage(page));
    }
    Ok(())
}

/// Read one page, unlocking with `password` first if given
pub fn read_page<T: CardTransport>(
    transport: &mut T,
    page: u8,
    password: Option<&Password>,
) -> Result<[u8; 4]> {
    if let Some(password) = password {
        authenticate(transport, password)?;
    }
    let data = io::read_page(transport, page, PAGE_READ_LEN)?;
    debug!(page, data = %hex::encode(data), "Ultralight page read");
    Ok(data)
}

/// Write one user page, unlocking with `password` first if given
///
/// Pages 0 to 3 hold the UID, lock bytes and capability container and are refused
/// before anything is sent.
pub fn write_page<T: CardTransport>(
    transport: &mut T,
    page: u8,
    data: &[u8; 4],
    password: Option<&Password>,
) -> Result<()> {
    ensure_user_page(page)?;
    if let Some(password) = password {
        authenticate(transport, password)?;
    }
    io::write_page(transport, page, data)?;
    info!(page, "Ultralight page written");
    Ok(())
}

/// Check a batch before any card access
pub fn validate_batch(pages: &[PageWrite]) -> Result<()> {
    if pages.is_empty() {
        return Err(Error::InvalidInput {
            field: "pages",
            reason: "no pages to write".to_string(),
        });
    }
    pages.iter().try_for_each(|write| ensure_user_page(write.page))
}

/// Write a batch of pages in one session
///
/// Every page runs its own fallback ladder, and a failed page does not stop the
/// batch. Only validation and password failures abort the whole call.
pub fn write_pages<T: CardTransport>(
    transport: &mut T,
    pages: &[PageWrite],
    password: Option<&Password>,
) -> Result<Vec<PageWriteResult>> {
    validate_batch(pages)?;
    if let Some(password) = password {
        authenticate(transport, password)?;
    }

    let results: Vec<PageWriteResult> = pages
        .iter()
        .map(|write| match io::write_page(transport, write.page, &write.data) {
            Ok(()) => PageWriteResult::written(write.page),
            Err(e) => {
                debug!(page = write.page, error = %e, "Batch page write failed");
                PageWriteResult::failed(write.page, e)
            }
        })
        .collect();

    let written = results.iter().filter(|result| result.success).count();
    info!(written, total = results.len(), "Ultralight batch written");
    Ok(results)
}

/// Rewrite AUTH0 in the configuration page, keeping its other bytes
fn write_auth0<T: CardTransport>(
    transport: &mut T,
    layout: PasswordLayout,
    auth0: u8,
) -> Result<()> {
    let mut config = io::read_page(transport, layout.config, SCAN_READ_LEN)?;
    config[PasswordLayout::AUTH0_OFFSET] = auth0;
    io::write_page(transport, layout.config, &config)
}

/// Protect pages from `start_page` onwards with `password`
///
/// The password and PACK are written before AUTH0, so the tag is never left
/// protected by a password that was not stored.
pub fn set_password<T: CardTransport>(
    transport: &mut T,
    layout: PasswordLayout,
    password: &Password,
    pack: &Pack,
    start_page: u8,
) -> Result<()> {
    io::write_page(transport, layout.password, password)?;
    io::write_page(transport, layout.pack, &[pack[0], pack[1], 0x00, 0x00])?;
    write_auth0(transport, layout, start_page)?;
    info!(start_page, "Password protection enabled");
    Ok(())
}

/// Unlock with the current password and disable protection
pub fn remove_password<T: CardTransport>(
    transport: &mut T,
    layout: PasswordLayout,
    password: &Password,
) -> Result<()> {
    authenticate(transport, password)?;
    write_auth0(transport, layout, AUTH0_DISABLED)?;
    info!("Password protection disabled");
    Ok(())
}

/// Set the static lock bytes, and the dynamic ones when the layout is known
///
/// This cannot be undone. The dynamic lock write is best effort: the static lock
/// has already taken effect when it runs.
pub fn lock<T: CardTransport>(transport: &mut T, layout: Option<PasswordLayout>) -> Result<()> {
    let current = io::read_page(transport, STATIC_LOCK_PAGE, SCAN_READ_LEN)?;
    io::write_page(
        transport,
        STATIC_LOCK_PAGE,
        &[current[0], current[1], 0xFF, 0xFF],
    )?;
    info!("Static lock bytes set");

    if let Some(layout) = layout {
        match io::write_page(transport, layout.dynamic_lock, &DYNAMIC_LOCK_ALL) {
            Ok(()) => info!(page = layout.dynamic_lock, "Dynamic lock bytes set"),
            Err(e) => warn!(
                page = layout.dynamic_lock,
                error = %e,
                "Dynamic lock bytes not set, static lock remains"
            ),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::mock::{EmulatedTag, ScriptedCard};

    const PASSWORD: Password = [0x12, 0x34, 0x56, 0x78];

    #[test]
    fn test_authenticate_checks_inner_status() {
        let mut tag = EmulatedTag::ntag213();
        assert!(authenticate(&mut tag, &[0xFF; 4]).is_ok());
        assert!(matches!(
            authenticate(&mut tag, &PASSWORD),
            Err(Error::PasswordAuthentication)
        ));

        let mut card = ScriptedCard::new(|_| Ok(vec![0x63, 0x00]));
        let error = authenticate(&mut card, &PASSWORD).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Authentication);
        assert_eq!(card.sent(), ["FF00000007D4421B12345678"]);

        // readers that strip the PN53x frame
        let mut card = ScriptedCard::new(|_| Ok(vec![0xAB, 0xCD, 0x90, 0x00]));
        assert!(authenticate(&mut card, &PASSWORD).is_ok());
    }

    #[test]
    fn test_system_pages_refused_without_transmit() {
        let mut card = ScriptedCard::new(|_| panic!("nothing may be sent"));
        assert!(matches!(
            write_page(&mut card, 3, &[0; 4], None),
            Err(Error::SystemPage(3))
        ));
        assert!(matches!(
            write_pages(&mut card, &[PageWrite::new(4, [0; 4]), PageWrite::new(0, [0; 4])], None),
            Err(Error::SystemPage(0))
        ));
        assert!(matches!(
            write_pages(&mut card, &[], None),
            Err(Error::InvalidInput { field: "pages", .. })
        ));
        assert!(card.sent().is_empty());
    }

    #[test]
    fn test_page_roundtrip() {
        let mut tag = EmulatedTag::ntag213();
        write_page(&mut tag, 6, &[0xDE, 0xAD, 0xBE, 0xEF], None).unwrap();
        assert_eq!(read_page(&mut tag, 6, None).unwrap(), [0xDE, 0xAD, 0xBE, 0xEF]);
        // system pages stay readable
        assert_eq!(read_page(&mut tag, 0, None).unwrap(), [0x04, 0x42, 0x48, 0x8a]);
    }

    #[test]
    fn test_batch_partial_failure() {
        let mut tag = EmulatedTag::ntag213();
        let results = write_pages(
            &mut tag,
            &[
                PageWrite::new(4, [1; 4]),
                PageWrite::new(200, [2; 4]),
                PageWrite::new(5, [3; 4]),
            ],
            None,
        )
        .unwrap();

        assert_eq!(results[0], PageWriteResult::written(4));
        assert_eq!(results[2], PageWriteResult::written(5));
        assert_eq!(results[1].page, 200);
        assert!(!results[1].success);
        assert!(
            results[1]
                .error
                .as_deref()
                .is_some_and(|e| e.contains("no supported method worked"))
        );
        assert_eq!(tag.memory(16, 8), [1, 1, 1, 1, 3, 3, 3, 3]);
    }

    #[test]
    fn test_set_and_remove_password() {
        let mut tag = EmulatedTag::ntag213();
        let layout = PasswordLayout::NTAG213;

        set_password(&mut tag, layout, &PASSWORD, &[0xAA, 0xBB], 4).unwrap();
        assert_eq!(tag.memory(43 * 4, 4), PASSWORD);
        assert_eq!(tag.memory(44 * 4, 4), [0xAA, 0xBB, 0x00, 0x00]);
        assert_eq!(tag.memory(41 * 4 + 3, 1), [4]);

        // protected until the password is presented
        assert!(write_page(&mut tag, 4, &[9; 4], None).is_err());
        write_page(&mut tag, 4, &[9; 4], Some(&PASSWORD)).unwrap();

        assert!(matches!(
            remove_password(&mut tag, layout, &[0; 4]),
            Err(Error::PasswordAuthentication)
        ));
        remove_password(&mut tag, layout, &PASSWORD).unwrap();
        assert_eq!(tag.memory(41 * 4 + 3, 1), [AUTH0_DISABLED]);
    }

    #[test]
    fn test_set_password_keeps_config_bytes() {
        let mut tag = EmulatedTag::ntag215();
        tag.write_memory(131 * 4, &[0x04, 0x00, 0x00, 0xFF]);
        set_password(&mut tag, PasswordLayout::NTAG215, &PASSWORD, &[0, 0], 16).unwrap();
        assert_eq!(tag.memory(131 * 4, 4), [0x04, 0x00, 0x00, 0x10]);
    }

    #[test]
    fn test_lock_sets_static_and_dynamic_bytes() {
        let mut tag = EmulatedTag::ntag213();
        tag.write_memory(8, &[0x48, 0x00, 0x00, 0x00]);
        lock(&mut tag, Some(PasswordLayout::NTAG213)).unwrap();

        assert_eq!(tag.memory(8, 4), [0x48, 0x00, 0xFF, 0xFF]);
        assert_eq!(tag.memory(40 * 4, 4), DYNAMIC_LOCK_ALL);
        assert!(write_page(&mut tag, 5, &[0; 4], None).is_err());
        assert!(write_page(&mut tag, 20, &[0; 4], None).is_err());
    }

    #[test]
    fn test_dynamic_lock_failure_is_not_an_error() {
        let mut tag = EmulatedTag::ntag213();
        // AUTH0 at the dynamic lock page blocks that write only
        tag.write_memory(41 * 4 + 3, &[40]);

        lock(&mut tag, Some(PasswordLayout::NTAG213)).unwrap();
        assert_eq!(tag.memory(10, 2), [0xFF, 0xFF]);
        assert_eq!(tag.memory(40 * 4, 4), [0; 4]);
    }
}
