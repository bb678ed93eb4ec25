use tapkit_transport_pcsc::{PcscDeviceManager, PcscReader};

use crate::utils::display;

/// Find a reader with a specific name
pub fn find_reader_by_name(
    manager: &PcscDeviceManager,
    reader_name: &str,
) -> Result<PcscReader, Box<dyn std::error::Error>> {
    let readers = manager.list_readers()?;

    readers
        .iter()
        .find(|r| r.name() == reader_name)
        .cloned()
        .ok_or_else(|| format!("Reader '{}' not found", reader_name).into())
}

/// List all available readers
pub fn list_readers(manager: &PcscDeviceManager) -> Result<(), Box<dyn std::error::Error>> {
    let readers = manager.list_readers()?;

    println!("{}", display::section_title("Available readers"));
    for (i, reader) in readers.iter().enumerate() {
        let status = match reader.atr() {
            Some(atr) => format!("card present, ATR {}", hex::encode(atr)),
            None => "no card".to_string(),
        };
        println!("{}. {} ({})", i + 1, reader.name(), status);
    }

    Ok(())
}

/// Find a reader with a card inserted
pub fn find_reader_with_card(
    manager: &PcscDeviceManager,
) -> Result<PcscReader, Box<dyn std::error::Error>> {
    let readers = manager.list_readers()?;

    let reader = readers
        .iter()
        .find(|r| r.has_card())
        .ok_or("No card found in any reader!")?;

    Ok(reader.clone())
}

/// The named reader, or the first one when no name is given
pub fn find_reader_to_wait_on(
    manager: &PcscDeviceManager,
    reader_name: Option<&str>,
) -> Result<PcscReader, Box<dyn std::error::Error>> {
    match reader_name {
        Some(name) => find_reader_by_name(manager, name),
        None => manager
            .list_readers()?
            .into_iter()
            .next()
            .ok_or_else(|| "No readers found!".into()),
    }
}
