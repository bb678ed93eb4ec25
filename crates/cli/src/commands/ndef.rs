//! Commands for NDEF content

use std::error::Error;
use std::fs;
use std::path::Path;

use tapkit::{PayloadType, RecordInput};
use tracing::debug;

use super::Operations;
use crate::utils::{Base64Bytes, display};

/// Print the card identity and content as JSON
pub fn read_command(operations: &Operations, reader: &str) -> Result<(), Box<dyn Error>> {
    let identity = operations.get_card_uid(reader)?;
    println!("{}", serde_json::to_string_pretty(&identity)?);
    Ok(())
}

/// Write data, and optionally a URL, as an NDEF message
pub fn write_command(
    operations: &Operations,
    reader: &str,
    data: Option<&str>,
    data_type: PayloadType,
    url: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let data = match (data, data_type) {
        (Some(encoded), PayloadType::Binary) => encoded.parse::<Base64Bytes>()?.0,
        (Some(text), _) => text.as_bytes().to_vec(),
        (None, _) => Vec::new(),
    };
    debug!(bytes = data.len(), %data_type, "Writing data");

    operations.write_data_with_url(reader, &data, &data_type.to_string(), url)?;
    println!("{}", display::success("Data written"));
    Ok(())
}

/// Write the records listed in a JSON file
pub fn write_records_command(
    operations: &Operations,
    reader: &str,
    file: &Path,
) -> Result<(), Box<dyn Error>> {
    let records: Vec<RecordInput> = serde_json::from_str(&fs::read_to_string(file)?)?;
    operations.write_multiple_records(reader, &records)?;
    println!(
        "{}",
        display::success(&format!("{} records written", records.len()))
    );
    Ok(())
}

/// Erase the NDEF message
pub fn erase_command(operations: &Operations, reader: &str) -> Result<(), Box<dyn Error>> {
    operations.erase_card(reader)?;
    println!("{}", display::success("Card erased"));
    Ok(())
}

/// Lock the tag, once confirmed
pub fn lock_command(
    operations: &Operations,
    reader: &str,
    confirmed: bool,
) -> Result<(), Box<dyn Error>> {
    if !confirmed {
        println!(
            "{}",
            display::warning("Locking cannot be undone. Run again with --yes to lock the tag.")
        );
        return Ok(());
    }

    operations.lock_card(reader)?;
    println!("{}", display::success("Card locked"));
    Ok(())
}
