//! Commands for MIFARE Classic blocks and keys

use std::error::Error;

use super::{KeyArgs, Operations};
use crate::utils::{HexBytes, display};

/// Read and print a data block
pub fn read_block_command(
    operations: &Operations,
    reader: &str,
    block: u8,
    auth: &KeyArgs,
) -> Result<(), Box<dyn Error>> {
    let data = operations.read_mifare_block(reader, block, key(auth), auth.key_type)?;
    println!(
        "{}",
        display::key_value_box(
            &format!("Block {block}"),
            vec![
                ("Hex", hex::encode(data)),
                ("ASCII", String::from_utf8_lossy(&data).into_owned()),
            ],
        )
    );
    Ok(())
}

/// Write a data block
pub fn write_block_command(
    operations: &Operations,
    reader: &str,
    block: u8,
    data: &HexBytes,
    auth: &KeyArgs,
) -> Result<(), Box<dyn Error>> {
    operations.write_mifare_block(reader, block, &data.0, key(auth), auth.key_type)?;
    println!("{}", display::success(&format!("Block {block} written")));
    Ok(())
}

/// Replace the keys of a sector
pub fn write_trailer_command(
    operations: &Operations,
    reader: &str,
    block: u8,
    key_a: &HexBytes,
    key_b: &HexBytes,
    auth: &KeyArgs,
) -> Result<(), Box<dyn Error>> {
    operations.write_sector_trailer(
        reader,
        block,
        &key_a.0,
        &key_b.0,
        key(auth),
        auth.key_type,
    )?;
    println!(
        "{}",
        display::success(&format!("Sector trailer {block} written"))
    );
    Ok(())
}

/// Print the sector key derived from the card UID
pub fn derive_key_command(
    operations: &Operations,
    reader: &str,
    aes_key: &HexBytes,
) -> Result<(), Box<dyn Error>> {
    let key = operations.derive_uid_key_aes(reader, &aes_key.0)?;
    println!("{}", hex::encode(key.as_bytes()));
    Ok(())
}

/// Encrypt and write a data block
pub fn aes_write_block_command(
    operations: &Operations,
    reader: &str,
    block: u8,
    data: &HexBytes,
    aes_key: &HexBytes,
    auth: &KeyArgs,
) -> Result<(), Box<dyn Error>> {
    operations.aes_encrypt_and_write_block(
        reader,
        block,
        &data.0,
        &aes_key.0,
        key(auth),
        auth.key_type,
    )?;
    println!(
        "{}",
        display::success(&format!("Encrypted data written to block {block}"))
    );
    Ok(())
}

fn key(auth: &KeyArgs) -> Option<&[u8]> {
    auth.key.as_ref().map(|key| key.0.as_slice())
}
