//! Utility functions and types for the tapkit CLI

pub mod display;
pub mod reader;

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tapkit::PageWrite;

/// Bytes given on the command line as hex, with optional spaces or colons
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

impl FromStr for HexBytes {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ':')
            .collect();
        let digits = digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
            .unwrap_or(&digits);
        hex::decode(digits).map(Self)
    }
}

impl fmt::Display for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

/// Binary payload given on the command line as standard base64
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base64Bytes(pub Vec<u8>);

impl FromStr for Base64Bytes {
    type Err = base64::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        STANDARD.decode(s.trim()).map(Self)
    }
}

/// One page of a batch write, written as `PAGE=HEX` (for example `5=01020304`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageArg(pub PageWrite);

impl FromStr for PageArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (page, data) = s
            .split_once('=')
            .ok_or_else(|| format!("expected PAGE=HEX, got {s:?}"))?;
        let page = page
            .trim()
            .parse::<u8>()
            .map_err(|e| format!("invalid page {page:?}: {e}"))?;
        let data = data
            .parse::<HexBytes>()
            .map_err(|e| format!("invalid data for page {page}: {e}"))?;
        let data: [u8; 4] = data
            .0
            .try_into()
            .map_err(|data: Vec<u8>| format!("page {page} needs 4 bytes, got {}", data.len()))?;
        Ok(Self(PageWrite::new(page, data)))
    }
}
