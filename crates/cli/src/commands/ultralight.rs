//! Commands for Ultralight/NTAG pages

use std::error::Error;

use colored::Colorize;
use tapkit::PageWrite;

use super::Operations;
use crate::utils::{HexBytes, PageArg, display};

fn password(password: Option<&HexBytes>) -> Option<&[u8]> {
    password.map(|password| password.0.as_slice())
}

/// Read and print a page
pub fn read_page_command(
    operations: &Operations,
    reader: &str,
    page: u8,
    pwd: Option<&HexBytes>,
) -> Result<(), Box<dyn Error>> {
    let data = operations.read_ultralight_page(reader, page, password(pwd))?;
    println!("Page {page}: {}", hex::encode(data));
    Ok(())
}

/// Write a page
pub fn write_page_command(
    operations: &Operations,
    reader: &str,
    page: u8,
    data: &HexBytes,
    pwd: Option<&HexBytes>,
) -> Result<(), Box<dyn Error>> {
    operations.write_ultralight_page(reader, page, &data.0, password(pwd))?;
    println!("{}", display::success(&format!("Page {page} written")));
    Ok(())
}

/// Write a batch of pages and report each one
pub fn write_pages_command(
    operations: &Operations,
    reader: &str,
    pages: &[PageArg],
    pwd: Option<&HexBytes>,
) -> Result<(), Box<dyn Error>> {
    let pages: Vec<PageWrite> = pages.iter().map(|PageArg(write)| *write).collect();
    let results = operations.write_ultralight_pages(reader, &pages, password(pwd))?;

    for result in &results {
        match &result.error {
            None => println!("Page {}: {}", result.page, "written".green()),
            Some(error) => println!("Page {}: {}", result.page, error.red()),
        }
    }

    let failed = results.iter().filter(|result| !result.success).count();
    if failed > 0 {
        return Err(format!("{failed} of {} pages not written", results.len()).into());
    }
    Ok(())
}
