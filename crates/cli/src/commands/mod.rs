use std::path::PathBuf;

use clap::{Args, Subcommand};
use tapkit::{CardOperations, KeyType, PayloadType};
use tapkit_transport_pcsc::PcscDeviceManager;

use crate::utils::{HexBytes, PageArg};

mod classic;
mod ndef;
mod password;
mod ultralight;

pub use classic::*;
pub use ndef::*;
pub use password::*;
pub use ultralight::*;

/// Card operations over the system PC/SC service
pub type Operations = CardOperations<PcscDeviceManager>;

/// Sector authentication options of MIFARE Classic commands
#[derive(Args, Debug, Clone)]
pub struct KeyArgs {
    /// Sector key in hex; the default transport keys are tried when omitted
    #[arg(short, long)]
    pub key: Option<HexBytes>,

    /// Key slot to authenticate with
    #[arg(long, value_enum, default_value_t = KeyType::A)]
    pub key_type: KeyType,
}

/// Define subcommands for the CLI
#[derive(Subcommand)]
pub enum Commands {
    /// List available readers
    List,

    /// Block until a card is presented to the reader
    Wait,

    /// Identify the card and print it, with any NDEF content, as JSON
    Read,

    /// Write data as an NDEF message, optionally preceded by a URL record
    Write {
        /// Data to store (base64 for binary)
        data: Option<String>,

        /// How to store the data
        #[arg(short = 't', long = "type", value_enum, default_value_t = PayloadType::Text)]
        data_type: PayloadType,

        /// URL written as the first record
        #[arg(short, long)]
        url: Option<String>,
    },

    /// Write the records described in a JSON file
    WriteRecords {
        /// JSON array of records, e.g. [{"type": "url", "data": "https://example.com"}]
        #[arg(short, long, required = true)]
        file: PathBuf,
    },

    /// Replace the NDEF message with an empty one
    Erase,

    /// Permanently make the tag read-only
    Lock {
        /// Confirm that the tag can never be written again
        #[arg(long)]
        yes: bool,
    },

    /// Protect an NTAG21x with a 4-byte password
    SetPassword {
        /// Password in hex
        #[arg(required = true)]
        password: HexBytes,

        /// Password acknowledge returned by the tag, 2 bytes in hex
        #[arg(long, default_value = "0000")]
        pack: HexBytes,

        /// First protected page
        #[arg(long, default_value_t = 4)]
        start_page: u8,
    },

    /// Remove NTAG21x password protection
    RemovePassword {
        /// Current password in hex
        #[arg(required = true)]
        password: HexBytes,
    },

    /// Read a MIFARE Classic data block
    ReadBlock {
        /// Block number
        block: u8,

        #[command(flatten)]
        auth: KeyArgs,
    },

    /// Write 16 bytes to a MIFARE Classic data block
    WriteBlock {
        /// Block number
        block: u8,

        /// Block data in hex
        data: HexBytes,

        #[command(flatten)]
        auth: KeyArgs,
    },

    /// Replace both keys of a MIFARE Classic sector, keeping its access bits
    WriteTrailer {
        /// Sector trailer block number
        block: u8,

        /// New key A in hex
        #[arg(long, required = true)]
        key_a: HexBytes,

        /// New key B in hex
        #[arg(long, required = true)]
        key_b: HexBytes,

        #[command(flatten)]
        auth: KeyArgs,
    },

    /// Read an Ultralight/NTAG page
    ReadPage {
        /// Page number
        page: u8,

        /// Password in hex, for protected pages
        #[arg(short, long)]
        password: Option<HexBytes>,
    },

    /// Write an Ultralight/NTAG user page
    WritePage {
        /// Page number, 4 or above
        page: u8,

        /// Page data, 4 bytes in hex
        data: HexBytes,

        /// Password in hex, for protected pages
        #[arg(short, long)]
        password: Option<HexBytes>,
    },

    /// Write several Ultralight/NTAG pages in one session
    WritePages {
        /// Pages as PAGE=HEX, e.g. 4=01020304 5=05060708
        #[arg(required = true)]
        pages: Vec<PageArg>,

        /// Password in hex, for protected pages
        #[arg(short, long)]
        password: Option<HexBytes>,
    },

    /// Derive the sector key of the card from its UID
    DeriveKey {
        /// AES-128 master key in hex
        #[arg(long, required = true)]
        aes_key: HexBytes,
    },

    /// Encrypt 16 bytes with AES-128 and write them to a MIFARE Classic block
    AesWriteBlock {
        /// Block number
        block: u8,

        /// Plaintext, 16 bytes in hex
        data: HexBytes,

        /// AES-128 key in hex
        #[arg(long, required = true)]
        aes_key: HexBytes,

        #[command(flatten)]
        auth: KeyArgs,
    },
}
