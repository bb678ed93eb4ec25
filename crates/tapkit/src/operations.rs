//! Card operations over a reader connector
//!
//! Every operation opens its own session on the named reader and releases it when
//! the transport drops, on success and on every error path. Arguments are checked
//! before the reader is touched.

use tapkit_apdu_core::CardConnector;
use tracing::{debug, instrument};

use crate::classic::{self, ClassicKey, KeyType};
use crate::crypto;
use crate::detect;
use crate::error::{Error, Result};
use crate::payload::{self, RecordInput};
use crate::storage;
use crate::types::{
    AddressScheme, CardIdentity, CardType, PageWrite, PageWriteResult, PasswordLayout,
};
use crate::ultralight::{self, Pack, Password};

fn parse_key(key: Option<&[u8]>) -> Result<Option<ClassicKey>> {
    key.map(ClassicKey::from_slice).transpose()
}

fn parse_password(password: &[u8]) -> Result<Password> {
    password
        .try_into()
        .map_err(|_| Error::invalid_length("password", 4, password.len()))
}

fn parse_block(data: &[u8]) -> Result<[u8; 16]> {
    data.try_into()
        .map_err(|_| Error::invalid_length("block data", 16, data.len()))
}

fn parse_page(data: &[u8]) -> Result<[u8; 4]> {
    data.try_into()
        .map_err(|_| Error::invalid_length("page data", 4, data.len()))
}

/// Password layout of an NTAG21x, or an error naming the operation
fn password_layout(card_type: CardType, operation: &'static str) -> Result<PasswordLayout> {
    card_type.password_layout().ok_or(Error::Unsupported {
        operation,
        card_type,
    })
}

/// High level operations on the cards presented to readers
#[derive(Debug, Clone)]
pub struct CardOperations<C: CardConnector> {
    connector: C,
}

impl<C: CardConnector> CardOperations<C> {
    /// Operate through `connector`
    pub const fn new(connector: C) -> Self {
        Self { connector }
    }

    /// The underlying connector
    pub const fn connector(&self) -> &C {
        &self.connector
    }

    fn connect(&self, reader: &str) -> Result<C::Transport> {
        let transport = self.connector.connect(reader)?;
        debug!(reader, "Session opened");
        Ok(transport)
    }

    /// Connect and identify the card
    fn detect(&self, reader: &str) -> Result<(C::Transport, CardIdentity)> {
        let mut transport = self.connect(reader)?;
        let identity = detect::identify(&mut transport)?;
        Ok((transport, identity))
    }

    /// Identify the card and decode any NDEF message it holds
    #[instrument(skip_all, fields(reader = %reader))]
    pub fn get_card_uid(&self, reader: &str) -> Result<CardIdentity> {
        let (mut transport, identity) = self.detect(reader)?;
        let profile = identity.profile;
        Ok(match storage::read_content(&mut transport, &profile) {
            Some(content) => identity.with_content(content),
            None => identity,
        })
    }

    /// Write `data` as an NDEF message, preceded by a URI record when `url` is given
    ///
    /// `data_type` is one of `json`, `text`, `binary` or `url`; see
    /// [`payload::data_message`] for how it combines with `url`.
    #[instrument(skip_all, fields(reader = %reader, data_type = %data_type))]
    pub fn write_data_with_url(
        &self,
        reader: &str,
        data: &[u8],
        data_type: &str,
        url: Option<&str>,
    ) -> Result<()> {
        let message = payload::data_message(data, data_type, url)?;
        let (mut transport, identity) = self.detect(reader)?;
        storage::write_message(&mut transport, &identity.profile, &message)
    }

    /// Write `data` as a single-record NDEF message
    pub fn write_data(&self, reader: &str, data: &[u8], data_type: &str) -> Result<()> {
        self.write_data_with_url(reader, data, data_type, None)
    }

    /// Write an NDEF message of several records
    #[instrument(skip_all, fields(reader = %reader, records = records.len()))]
    pub fn write_multiple_records(&self, reader: &str, records: &[RecordInput]) -> Result<()> {
        let message = payload::records_message(records)?;
        let (mut transport, identity) = self.detect(reader)?;
        storage::write_message(&mut transport, &identity.profile, &message)
    }

    /// Replace the stored NDEF message with an empty one
    #[instrument(skip_all, fields(reader = %reader))]
    pub fn erase_card(&self, reader: &str) -> Result<()> {
        let (mut transport, identity) = self.detect(reader)?;
        storage::erase(&mut transport, &identity.profile)
    }

    /// Permanently make the tag read-only
    ///
    /// Only page-addressed tags can be locked.
    #[instrument(skip_all, fields(reader = %reader))]
    pub fn lock_card(&self, reader: &str) -> Result<()> {
        let (mut transport, identity) = self.detect(reader)?;
        let card_type = identity.card_type();
        match card_type.scheme() {
            AddressScheme::Type2Pages => {
                ultralight::lock(&mut transport, card_type.password_layout())
            }
            AddressScheme::ClassicBlocks | AddressScheme::VicinityBlocks => {
                Err(Error::Unsupported {
                    operation: "lock",
                    card_type,
                })
            }
        }
    }

    /// Protect an NTAG21x from `start_page` onwards
    #[instrument(skip_all, fields(reader = %reader, start_page = start_page))]
    pub fn set_password(
        &self,
        reader: &str,
        password: &[u8],
        pack: &[u8],
        start_page: u8,
    ) -> Result<()> {
        let password = parse_password(password)?;
        let pack = Pack::try_from(pack).map_err(|_| Error::invalid_length("PACK", 2, pack.len()))?;

        let (mut transport, identity) = self.detect(reader)?;
        let layout = password_layout(identity.card_type(), "set password")?;
        ultralight::set_password(&mut transport, layout, &password, &pack, start_page)
    }

    /// Remove NTAG21x password protection, unlocking with the current password
    #[instrument(skip_all, fields(reader = %reader))]
    pub fn remove_password(&self, reader: &str, password: &[u8]) -> Result<()> {
        let password = parse_password(password)?;

        let (mut transport, identity) = self.detect(reader)?;
        let layout = password_layout(identity.card_type(), "remove password")?;
        ultralight::remove_password(&mut transport, layout, &password)
    }

    /// Read a MIFARE Classic data block
    #[instrument(skip_all, fields(reader = %reader, block = block, %key_type))]
    pub fn read_mifare_block(
        &self,
        reader: &str,
        block: u8,
        key: Option<&[u8]>,
        key_type: KeyType,
    ) -> Result<[u8; 16]> {
        classic::ensure_data_block(block)?;
        let key = parse_key(key)?;

        let mut transport = self.connect(reader)?;
        classic::read_block(&mut transport, block, key, key_type)
    }

    /// Write a MIFARE Classic data block
    #[instrument(skip_all, fields(reader = %reader, block = block, %key_type))]
    pub fn write_mifare_block(
        &self,
        reader: &str,
        block: u8,
        data: &[u8],
        key: Option<&[u8]>,
        key_type: KeyType,
    ) -> Result<()> {
        classic::ensure_data_block(block)?;
        let data = parse_block(data)?;
        let key = parse_key(key)?;

        let mut transport = self.connect(reader)?;
        classic::write_block(&mut transport, block, &data, key, key_type)
    }

    /// Replace the keys of the sector whose trailer is `block`
    #[instrument(skip_all, fields(reader = %reader, block = block, %auth_key_type))]
    pub fn write_sector_trailer(
        &self,
        reader: &str,
        block: u8,
        key_a: &[u8],
        key_b: &[u8],
        auth_key: Option<&[u8]>,
        auth_key_type: KeyType,
    ) -> Result<()> {
        if !classic::is_sector_trailer(block) {
            return Err(Error::NotSectorTrailer(block));
        }
        let key_a = ClassicKey::from_slice(key_a)?;
        let key_b = ClassicKey::from_slice(key_b)?;
        let auth_key = parse_key(auth_key)?;

        let mut transport = self.connect(reader)?;
        classic::write_sector_trailer(
            &mut transport,
            block,
            &key_a,
            &key_b,
            auth_key,
            auth_key_type,
        )
    }

    /// Read an Ultralight or NTAG page
    #[instrument(skip_all, fields(reader = %reader, page = page))]
    pub fn read_ultralight_page(
        &self,
        reader: &str,
        page: u8,
        password: Option<&[u8]>,
    ) -> Result<[u8; 4]> {
        let password = password.map(parse_password).transpose()?;

        let mut transport = self.connect(reader)?;
        ultralight::read_page(&mut transport, page, password.as_ref())
    }

    /// Write an Ultralight or NTAG user page
    #[instrument(skip_all, fields(reader = %reader, page = page))]
    pub fn write_ultralight_page(
        &self,
        reader: &str,
        page: u8,
        data: &[u8],
        password: Option<&[u8]>,
    ) -> Result<()> {
        ultralight::ensure_user_page(page)?;
        let data = parse_page(data)?;
        let password = password.map(parse_password).transpose()?;

        let mut transport = self.connect(reader)?;
        ultralight::write_page(&mut transport, page, &data, password.as_ref())
    }

    /// Write several pages in one session, reporting each page separately
    #[instrument(skip_all, fields(reader = %reader, pages = pages.len()))]
    pub fn write_ultralight_pages(
        &self,
        reader: &str,
        pages: &[PageWrite],
        password: Option<&[u8]>,
    ) -> Result<Vec<PageWriteResult>> {
        ultralight::validate_batch(pages)?;
        let password = password.map(parse_password).transpose()?;

        let mut transport = self.connect(reader)?;
        ultralight::write_pages(&mut transport, pages, password.as_ref())
    }

    /// Derive the sector key of the card on the reader from its 4-byte UID
    #[instrument(skip_all, fields(reader = %reader))]
    pub fn derive_uid_key_aes(&self, reader: &str, aes_key: &[u8]) -> Result<ClassicKey> {
        let aes_key = crypto::aes_key_from_slice(aes_key)?;

        let mut transport = self.connect(reader)?;
        let uid = detect::read_uid(&mut transport)?;
        crypto::derive_uid_key(&aes_key, &uid)
    }

    /// Encrypt 16 bytes under `aes_key` and write them to a Classic data block
    #[instrument(skip_all, fields(reader = %reader, block = block, %auth_key_type))]
    pub fn aes_encrypt_and_write_block(
        &self,
        reader: &str,
        block: u8,
        data: &[u8],
        aes_key: &[u8],
        auth_key: Option<&[u8]>,
        auth_key_type: KeyType,
    ) -> Result<()> {
        classic::ensure_data_block(block)?;
        let data = parse_block(data)?;
        let aes_key = crypto::aes_key_from_slice(aes_key)?;
        let auth_key = parse_key(auth_key)?;

        let mut transport = self.connect(reader)?;
        crypto::encrypt_and_write_block(
            &mut transport,
            block,
            &data,
            &aes_key,
            auth_key,
            auth_key_type,
        )
    }
}
