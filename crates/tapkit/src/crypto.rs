//! AES-128 key diversification and encrypted block writes for MIFARE Classic
//!
//! A sector key is derived from the card UID by tiling the 4-byte UID to one AES
//! block, encrypting it under a 16-byte master key in ECB mode and keeping the first
//! six bytes of the ciphertext.

use aes::Aes128;
use cipher::{Block, BlockEncrypt, KeyInit};
use tapkit_apdu_core::CardTransport;
use tracing::info;
use zeroize::Zeroizing;

use crate::classic::{self, ClassicKey, KeyType};
use crate::error::{Error, Result};

/// AES-128 key
pub type AesKey = [u8; 16];

/// UID length accepted by [`derive_uid_key`]
pub const DERIVATION_UID_LEN: usize = 4;

/// Parse a 16-byte AES key
pub fn aes_key_from_slice(key: &[u8]) -> Result<Zeroizing<AesKey>> {
    key.try_into()
        .map(Zeroizing::new)
        .map_err(|_| Error::invalid_length("AES key", 16, key.len()))
}

/// Encrypt one block with AES-128 in ECB mode
pub fn encrypt_block(key: &AesKey, data: &[u8; 16]) -> [u8; 16] {
    let cipher = Aes128::new(key.into());
    let mut block = Block::<Aes128>::from(*data);
    cipher.encrypt_block(&mut block);
    block.into()
}

/// Derive the 6-byte sector key of a card from its UID
pub fn derive_uid_key(aes_key: &AesKey, uid: &[u8]) -> Result<ClassicKey> {
    if uid.len() != DERIVATION_UID_LEN {
        return Err(Error::UidLength(uid.len()));
    }

    let mut tiled = [0u8; 16];
    for (byte, value) in tiled.iter_mut().zip(uid.iter().cycle()) {
        *byte = *value;
    }

    let ciphertext = Zeroizing::new(encrypt_block(aes_key, &tiled));
    let mut key = [0u8; ClassicKey::LEN];
    key.copy_from_slice(&ciphertext[..ClassicKey::LEN]);
    Ok(ClassicKey::new(key))
}

/// Encrypt `data` and write the ciphertext to a Classic data block
pub fn encrypt_and_write_block<T: CardTransport>(
    transport: &mut T,
    block: u8,
    data: &[u8; 16],
    aes_key: &AesKey,
    auth_key: Option<ClassicKey>,
    auth_key_type: KeyType,
) -> Result<()> {
    let ciphertext = encrypt_block(aes_key, data);
    classic::write_block(transport, block, &ciphertext, auth_key, auth_key_type)?;
    info!(block, "AES encrypted block written");
    Ok(())
}
