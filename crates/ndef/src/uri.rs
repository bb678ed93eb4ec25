//! URI identifier codes of the NFC Forum URI record type

/// Prefix for each identifier code; the index is the code
pub const PREFIXES: [&str; 36] = [
    "",
    "http://www.",
    "https://www.",
    "http://",
    "https://",
    "tel:",
    "mailto:",
    "ftp://anonymous:anonymous@",
    "ftp://ftp.",
    "ftps://",
    "sftp://",
    "smb://",
    "nfs://",
    "ftp://",
    "dav://",
    "news:",
    "telnet://",
    "imap:",
    "rtsp://",
    "urn:",
    "pop:",
    "sip:",
    "sips:",
    "tftp:",
    "btspp://",
    "btl2cap://",
    "btgoep://",
    "tcpobex://",
    "irdaobex://",
    "file://",
    "urn:epc:id:",
    "urn:epc:tag:",
    "urn:epc:pat:",
    "urn:epc:raw:",
    "urn:epc:",
    "urn:nfc:",
];

/// Codes the encoder abbreviates with
const ENCODER_CODES: [u8; 6] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];

/// Prefix for an identifier code; reserved codes expand to nothing
pub fn prefix(code: u8) -> &'static str {
    PREFIXES.get(usize::from(code)).copied().unwrap_or_default()
}

/// Split a URI into the identifier code of its longest known prefix and the remainder
///
/// URIs without a known prefix are returned whole with code `0x00`.
pub fn abbreviate(uri: &str) -> (u8, &str) {
    ENCODER_CODES
        .iter()
        .map(|&code| (code, prefix(code)))
        .filter(|(_, prefix)| uri.starts_with(prefix))
        .max_by_key(|(_, prefix)| prefix.len())
        .map_or((0x00, uri), |(code, prefix)| (code, &uri[prefix.len()..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_prefix_wins() {
        assert_eq!(abbreviate("https://www.example.com"), (0x02, "example.com"));
        assert_eq!(abbreviate("http://www.example.com"), (0x01, "example.com"));
        assert_eq!(abbreviate("https://example.com"), (0x04, "example.com"));
        assert_eq!(abbreviate("http://example.com"), (0x03, "example.com"));
        assert_eq!(abbreviate("tel:+31201234567"), (0x05, "+31201234567"));
        assert_eq!(abbreviate("mailto:ops@example.com"), (0x06, "ops@example.com"));
    }

    #[test]
    fn test_unknown_prefix_kept_whole() {
        assert_eq!(abbreviate("ftp://host/file"), (0x00, "ftp://host/file"));
        assert_eq!(abbreviate("example.com"), (0x00, "example.com"));
    }

    #[test]
    fn test_abbreviation_never_keeps_prefix_bytes() {
        for uri in ["https://a.b", "http://www.c.d", "mailto:e@f", "tel:1"] {
            let (code, rest) = abbreviate(uri);
            assert_ne!(code, 0x00);
            assert_eq!(format!("{}{}", prefix(code), rest), uri);
            assert!(!rest.starts_with(prefix(code)));
        }
    }

    #[test]
    fn test_prefix_table() {
        assert_eq!(prefix(0x00), "");
        assert_eq!(prefix(0x1D), "file://");
        assert_eq!(prefix(0x23), "urn:nfc:");
        assert_eq!(prefix(0x24), "");
        assert_eq!(prefix(0xFF), "");
    }
}
