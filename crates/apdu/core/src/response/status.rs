//! Status word definitions for APDU responses

use std::fmt;

use tracing::Level;

/// Status Word (SW1-SW2) from an APDU response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord {
    /// First status byte (SW1)
    pub sw1: u8,
    /// Second status byte (SW2)
    pub sw2: u8,
}

impl StatusWord {
    /// Create a new status word
    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self { sw1, sw2 }
    }

    /// Create from a u16 value (SW1 | SW2)
    pub const fn from_u16(status: u16) -> Self {
        Self {
            sw1: (status >> 8) as u8,
            sw2: status as u8,
        }
    }

    /// Convert to a u16 value (SW1 | SW2)
    pub const fn to_u16(&self) -> u16 {
        ((self.sw1 as u16) << 8) | (self.sw2 as u16)
    }

    /// Check if this status word indicates success (90 00)
    pub const fn is_success(&self) -> bool {
        self.sw1 == 0x90 && self.sw2 == 0x00
    }

    /// Check if SW1 reports completion (90 XX)
    ///
    /// Some readers report key loading and authentication with a non-zero SW2.
    pub const fn is_completed(&self) -> bool {
        self.sw1 == 0x90
    }

    /// Check if the reader reports that the operation failed on the card (63 00)
    pub const fn is_operation_failed(&self) -> bool {
        self.sw1 == 0x63 && self.sw2 == 0x00
    }

    /// Check if this status word indicates a security condition not satisfied (69 82)
    pub const fn is_security_condition_not_satisfied(&self) -> bool {
        self.sw1 == 0x69 && self.sw2 == 0x82
    }

    /// Check if this status word indicates the function is not supported (6A 81)
    pub const fn is_function_not_supported(&self) -> bool {
        self.sw1 == 0x6A && self.sw2 == 0x81
    }

    /// Get the appropriate tracing level for this status word
    pub const fn tracing_level(&self) -> Level {
        if self.is_success() {
            Level::DEBUG
        } else if self.sw1 == 0x62 || self.sw1 == 0x63 {
            Level::INFO
        } else {
            Level::WARN
        }
    }

    /// Get a description of this status word as reported by PC/SC storage card readers
    pub const fn description(&self) -> &'static str {
        match (self.sw1, self.sw2) {
            (0x90, 0x00) => "Success",
            (0x62, 0x82) => "End of memory reached before reading Le bytes",
            (0x63, 0x00) => "Operation failed",
            (0x65, 0x81) => "Memory failure",
            (0x67, 0x00) => "Wrong length",
            (0x68, 0x00) => "Function in CLA not supported",
            (0x69, 0x00) => "Command not allowed",
            (0x69, 0x81) => "Command incompatible with file structure",
            (0x69, 0x82) => "Security status not satisfied",
            (0x69, 0x83) => "Authentication method blocked",
            (0x69, 0x86) => "Command not allowed",
            (0x6A, 0x81) => "Function not supported",
            (0x6A, 0x82) => "Address not found",
            (0x6B, 0x00) => "Wrong parameters P1-P2",
            (0x6C, _) => "Wrong Le field",
            (0x6D, 0x00) => "Instruction code not supported or invalid",
            (0x6E, 0x00) => "Class not supported",
            (0x6F, 0x00) => "No precise diagnosis",
            _ => "Unknown status word",
        }
    }
}

impl From<(u8, u8)> for StatusWord {
    fn from(tuple: (u8, u8)) -> Self {
        Self::new(tuple.0, tuple.1)
    }
}

impl From<u16> for StatusWord {
    fn from(status: u16) -> Self {
        Self::from_u16(status)
    }
}

impl From<StatusWord> for u16 {
    fn from(status: StatusWord) -> Self {
        status.to_u16()
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X} {:02X}", self.sw1, self.sw2)
    }
}

/// Common status words
pub mod common {
    use super::StatusWord;

    /// Success (90 00)
    pub const SUCCESS: StatusWord = StatusWord::new(0x90, 0x00);

    /// Operation failed (63 00)
    pub const OPERATION_FAILED: StatusWord = StatusWord::new(0x63, 0x00);

    /// Command not allowed (69 86)
    pub const COMMAND_NOT_ALLOWED: StatusWord = StatusWord::new(0x69, 0x86);

    /// Security condition not satisfied (69 82)
    pub const SECURITY_CONDITION_NOT_SATISFIED: StatusWord = StatusWord::new(0x69, 0x82);

    /// Function not supported (6A 81)
    pub const FUNCTION_NOT_SUPPORTED: StatusWord = StatusWord::new(0x6A, 0x81);

    /// Address not found (6A 82)
    pub const ADDRESS_NOT_FOUND: StatusWord = StatusWord::new(0x6A, 0x82);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_word_from_to_u16() {
        let sw = StatusWord::from_u16(0x9000);
        assert_eq!(sw.sw1, 0x90);
        assert_eq!(sw.sw2, 0x00);
        assert_eq!(sw.to_u16(), 0x9000);
        assert_eq!(u16::from(common::FUNCTION_NOT_SUPPORTED), 0x6A81);
    }

    #[test]
    fn test_status_word_predicates() {
        assert!(common::SUCCESS.is_success());
        assert!(StatusWord::new(0x90, 0x01).is_completed());
        assert!(!StatusWord::new(0x90, 0x01).is_success());
        assert!(common::OPERATION_FAILED.is_operation_failed());
        assert!(common::SECURITY_CONDITION_NOT_SATISFIED.is_security_condition_not_satisfied());
        assert!(common::FUNCTION_NOT_SUPPORTED.is_function_not_supported());
    }

    #[test]
    fn test_status_word_display_and_description() {
        assert_eq!(StatusWord::new(0x6A, 0x81).to_string(), "6A 81");
        assert_eq!(StatusWord::new(0x63, 0x00).description(), "Operation failed");
        assert_eq!(StatusWord::new(0x12, 0x34).description(), "Unknown status word");
        assert_eq!(common::OPERATION_FAILED.tracing_level(), Level::INFO);
    }
}
