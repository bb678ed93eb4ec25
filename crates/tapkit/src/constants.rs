use std::time::Duration;

/// Bytes in a Type 2 page or ISO 15693 block
pub const PAGE_SIZE: usize = 4;
/// Bytes in a MIFARE Classic block
pub const BLOCK_SIZE: usize = 16;
/// First page (or Classic block) that holds user data
pub const FIRST_USER_PAGE: u8 = 4;

/// Pause before the alternate GET_VERSION encoding when the primary exchange failed.
/// Some readers reject any command sent right after a failed passthrough.
pub const GET_VERSION_SETTLE: Duration = Duration::from_millis(150);

/// Instruction bytes of the PC/SC pseudo-APDUs (class `FF`)
pub mod ins {
    /// Direct transmit to the reader's contactless front end
    pub const DIRECT_TRANSMIT: u8 = 0x00;
    /// Load a MIFARE key into the reader's volatile key slot
    pub const LOAD_KEY: u8 = 0x82;
    /// General authenticate against a MIFARE Classic block
    pub const GENERAL_AUTHENTICATE: u8 = 0x86;
    /// Read binary
    pub const READ_BINARY: u8 = 0xB0;
    /// Transparent exchange session control and transceive
    pub const TRANSPARENT_EXCHANGE: u8 = 0xC2;
    /// Get data (UID)
    pub const GET_DATA: u8 = 0xCA;
    /// Update binary
    pub const UPDATE_BINARY: u8 = 0xD6;
}

/// Native Type 2 tag commands
pub mod native {
    /// GET_VERSION
    pub const GET_VERSION: u8 = 0x60;
    /// READ, returns four pages
    pub const READ: u8 = 0x30;
    /// WRITE, one page
    pub const WRITE: u8 = 0xA2;
    /// PWD_AUTH
    pub const PWD_AUTH: u8 = 0x1B;
    /// Acknowledge nibble returned by a successful WRITE
    pub const ACK: u8 = 0x0A;
}

/// PN53x frames used by communicate-thru readers
pub mod pn53x {
    /// InCommunicateThru request
    pub const IN_COMMUNICATE_THRU: [u8; 2] = [0xD4, 0x42];
    /// InCommunicateThru response header; the status byte follows
    pub const IN_COMMUNICATE_THRU_RESPONSE: [u8; 2] = [0xD5, 0x43];
}

/// Transparent exchange data objects
pub mod transparent {
    /// P2 of session management
    pub const P2_MANAGE_SESSION: u8 = 0x00;
    /// P2 of transceive
    pub const P2_TRANSCEIVE: u8 = 0x01;
    /// P2 of protocol switching
    pub const P2_SWITCH_PROTOCOL: u8 = 0x02;

    /// Start session
    pub const START_SESSION: [u8; 2] = [0x81, 0x00];
    /// End session
    pub const END_SESSION: [u8; 2] = [0x82, 0x00];
    /// Switch to ISO 14443-A layer 3
    pub const ISO14443A_LAYER3: [u8; 4] = [0x8F, 0x02, 0x00, 0x03];
    /// Transceive data object
    pub const TRANSCEIVE: u8 = 0x95;
    /// Response data object
    pub const RESPONSE_DATA: u8 = 0x97;
}

/// MIFARE Classic authentication parameters
pub mod classic {
    /// Version byte of the general authenticate data block
    pub const AUTH_VERSION: u8 = 0x01;
    /// Key slot used for every load and authenticate
    pub const KEY_SLOT: u8 = 0x00;
    /// Key A selector
    pub const KEY_A: u8 = 0x60;
    /// Key B selector
    pub const KEY_B: u8 = 0x61;

    /// Keys tried in order when the caller supplies none
    pub const DEFAULT_KEYS: [[u8; 6]; 4] = [
        // transport
        [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF],
        // NFC Forum
        [0xD3, 0xF7, 0xD3, 0xF7, 0xD3, 0xF7],
        // MAD
        [0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5],
        [0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
    ];

    /// Last data block of a 1K card
    pub const LAST_BLOCK_1K: u8 = 63;
    /// Offset of the access bits inside a sector trailer
    pub const ACCESS_BITS: core::ops::Range<usize> = 6..10;
}

/// Capability container written to ISO 15693 tags before the NDEF TLV
pub const ISO15693_CC: [u8; 4] = [0xE1, 0x40, 0x40, 0x00];

/// AUTH0 value that disables password protection
pub const AUTH0_DISABLED: u8 = 0xFF;

/// Dynamic lock bytes set by a permanent lock; the fourth byte is reserved
pub const DYNAMIC_LOCK_ALL: [u8; 4] = [0xFF, 0xFF, 0xFF, 0x00];
