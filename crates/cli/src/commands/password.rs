//! Commands for NTAG21x password protection

use std::error::Error;

use super::Operations;
use crate::utils::{HexBytes, display};

/// Protect the tag from `start_page` onwards
pub fn set_password_command(
    operations: &Operations,
    reader: &str,
    password: &HexBytes,
    pack: &HexBytes,
    start_page: u8,
) -> Result<(), Box<dyn Error>> {
    operations.set_password(reader, &password.0, &pack.0, start_page)?;
    println!(
        "{}",
        display::success(&format!("Password set, pages {start_page} and above protected"))
    );
    Ok(())
}

/// Disable password protection
pub fn remove_password_command(
    operations: &Operations,
    reader: &str,
    password: &HexBytes,
) -> Result<(), Box<dyn Error>> {
    operations.remove_password(reader, &password.0)?;
    println!("{}", display::success("Password protection removed"));
    Ok(())
}
