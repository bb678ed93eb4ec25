//! Card family detection
//!
//! Readers disagree on how to pass native tag commands through, and several tag
//! families look alike on the wire, so detection is an ordered cascade of methods.
//! Each method either settles the family or passes what it learned on to the next.
//! Detection never fails: a card nothing recognises is reported as
//! [`CardType::Unknown`].

use bytes::Bytes;
use derive_more::Display;
use tapkit_apdu_core::{CardTransport, Response};
use tracing::{debug, instrument};

use crate::commands;
use crate::constants::GET_VERSION_SETTLE;
use crate::constants::classic::{DEFAULT_KEYS, KEY_A};
use crate::error::{Error, Result};
use crate::types::{Atr, CapabilityContainer, CardIdentity, CardProfile, CardType, VersionInfo};

/// Detection methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Method {
    /// GET_VERSION wrapped with an explicit Le
    #[display("GET_VERSION")]
    GetVersion,
    /// GET_VERSION in the shorter encoding some readers insist on
    #[display("GET_VERSION (short)")]
    GetVersionShort,
    /// Capability container read through page 1
    #[display("CC via page 1")]
    CapabilityPage1,
    /// Capability container read from page 3
    #[display("CC via page 3")]
    CapabilityPage3,
    /// Authenticate block 0 with the transport key
    #[display("MIFARE Classic probe")]
    ClassicProbe,
    /// Standard and card name bytes of the ATR
    #[display("ATR pattern")]
    AtrPattern,
}

/// Order in which the methods run
pub const CASCADE: [Method; 6] = [
    Method::GetVersion,
    Method::GetVersionShort,
    Method::CapabilityPage1,
    Method::CapabilityPage3,
    Method::ClassicProbe,
    Method::AtrPattern,
];

/// Result of one detection method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Identified(CardProfile),
    Fallthrough,
}

/// What earlier methods learned without identifying the card
#[derive(Debug, Default)]
struct Evidence {
    /// A GET_VERSION reply passed validation
    version_answered: bool,
    /// The first GET_VERSION exchange failed outright
    version_exchange_failed: bool,
    /// An NDEF capability container was found
    ndef_cc_found: bool,
}

/// Offset of the CC inside a 16-byte read starting at page 1
const PAGE1_CC_OFFSET: usize = 8;
/// Minimum payload of the page 1 read
const PAGE1_MIN_PAYLOAD: usize = PAGE1_CC_OFFSET + 4;
/// Byte 7 of an ISO 15693 UID holding the NXP manufacturer code
const ISO15693_MANUFACTURER_OFFSET: usize = 7;
const MANUFACTURER_NXP: u8 = 0xE0;

struct Cascade<'a> {
    atr: &'a Atr,
    uid: &'a [u8],
    evidence: Evidence,
}

impl Cascade<'_> {
    fn run<T: CardTransport>(&mut self, transport: &mut T, method: Method) -> Outcome {
        match method {
            Method::GetVersion => {
                let response = transport.transmit(&commands::get_version());
                self.evidence.version_exchange_failed = !matches!(
                    &response,
                    Ok(r) if r.payload().len() >= VersionInfo::LEN && r.status().is_completed()
                );
                self.version_outcome(response.ok())
            }
            Method::GetVersionShort => {
                if self.evidence.version_exchange_failed {
                    std::thread::sleep(GET_VERSION_SETTLE);
                }
                let response = transport.transmit(&commands::get_version_short()).ok();
                self.version_outcome(response)
            }
            Method::CapabilityPage1 => {
                self.capability_outcome(transport, 1, PAGE1_MIN_PAYLOAD, PAGE1_CC_OFFSET)
            }
            Method::CapabilityPage3 => {
                self.capability_outcome(transport, 3, CapabilityContainer::LEN, 0)
            }
            Method::ClassicProbe => self.classic_probe(transport),
            Method::AtrPattern => self.atr_outcome(),
        }
    }

    fn version_outcome(&mut self, response: Option<Response>) -> Outcome {
        let Some(version) = response.as_ref().and_then(VersionInfo::parse) else {
            return Outcome::Fallthrough;
        };
        self.evidence.version_answered = true;
        debug!(
            product_type = version.product_type,
            storage_size = version.storage_size,
            "GET_VERSION answered"
        );
        version
            .profile()
            .map_or(Outcome::Fallthrough, Outcome::Identified)
    }

    fn capability_outcome<T: CardTransport>(
        &mut self,
        transport: &mut T,
        page: u8,
        min_payload: usize,
        offset: usize,
    ) -> Outcome {
        let Ok(response) = transport.transmit(&commands::read_binary(page, 0x10)) else {
            return Outcome::Fallthrough;
        };
        let payload = response.payload();
        if !response.status().is_completed() || payload.len() < min_payload {
            return Outcome::Fallthrough;
        }
        let Some(cc) = payload.get(offset..).and_then(CapabilityContainer::from_bytes) else {
            return Outcome::Fallthrough;
        };
        if cc.is_ndef() {
            self.evidence.ndef_cc_found = true;
            debug!(page, size = cc.size, "NDEF capability container found");
        }
        cc.profile().map_or(Outcome::Fallthrough, Outcome::Identified)
    }

    fn classic_probe<T: CardTransport>(&self, transport: &mut T) -> Outcome {
        if !self.atr.has_iso14443a_pattern() {
            return Outcome::Fallthrough;
        }
        let completed = |response: tapkit_apdu_core::Result<Response>| {
            response.is_ok_and(|r| r.status().is_completed())
        };
        if completed(transport.transmit(&commands::load_key(&DEFAULT_KEYS[0])))
            && completed(transport.transmit(&commands::authenticate(0, KEY_A)))
        {
            return Outcome::Identified(CardProfile::new(CardType::MifareClassic, 1024));
        }
        Outcome::Fallthrough
    }

    fn atr_outcome(&self) -> Outcome {
        if !self.atr.is_storage_card() {
            return Outcome::Fallthrough;
        }
        if self.atr.has_iso15693_pattern() {
            let nxp = self.uid.get(ISO15693_MANUFACTURER_OFFSET) == Some(&MANUFACTURER_NXP);
            return Outcome::Identified(if nxp {
                CardProfile::new(CardType::IcodeSlix, 896)
            } else {
                CardProfile::new(CardType::Iso15693, 1024)
            });
        }
        if self.atr.has_iso14443a_pattern() {
            match self.atr.card_name() {
                Some(Atr::CARD_NAME_CLASSIC_1K) => {
                    return Outcome::Identified(CardProfile::new(CardType::MifareClassic, 1024));
                }
                Some(Atr::CARD_NAME_ULTRALIGHT)
                    if !self.evidence.ndef_cc_found && !self.evidence.version_answered =>
                {
                    return Outcome::Identified(CardProfile::new(
                        CardType::MifareUltralight,
                        64,
                    ));
                }
                _ => {}
            }
        }
        Outcome::Fallthrough
    }
}

/// Identify the family of the card in session
///
/// The methods of [`CASCADE`] run in order until one identifies the card. Anything
/// left unidentified is an unknown but writable tag.
#[instrument(level = "debug", skip_all, fields(uid = %hex::encode(uid)))]
pub fn detect<T: CardTransport>(transport: &mut T, atr: &Atr, uid: &[u8]) -> CardProfile {
    let mut cascade = Cascade {
        atr,
        uid,
        evidence: Evidence::default(),
    };

    for method in CASCADE {
        if let Outcome::Identified(profile) = cascade.run(transport, method) {
            debug!(%method, card_type = %profile.card_type, size = profile.size, "Card identified");
            return profile;
        }
        debug!(%method, "Detection method inconclusive");
    }

    debug!("No detection method identified the card");
    CardProfile::unknown()
}

/// Read the UID of the card in session
pub fn read_uid<T: CardTransport>(transport: &mut T) -> Result<Bytes> {
    let response = transport.transmit(&commands::get_uid())?;
    if !response.is_success() {
        return Err(Error::Status {
            operation: "get UID",
            status: response.status(),
        });
    }
    Ok(response.payload().clone())
}

/// Read UID and ATR, then detect the family
pub fn identify<T: CardTransport>(transport: &mut T) -> Result<CardIdentity> {
    let atr = Atr::new(transport.atr()?);
    let uid = read_uid(transport)?;
    let profile = detect(transport, &atr, &uid);
    Ok(CardIdentity::new(
        uid,
        Bytes::copy_from_slice(atr.as_bytes()),
        profile,
        atr.protocol(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{EmulatedTag, ISO15693_ATR, NTAG_ATR, NTAG_UID, ScriptedCard};
    use crate::types::Protocol;

    fn identify_tag(mut tag: EmulatedTag) -> CardIdentity {
        identify(&mut tag).unwrap()
    }

    #[test]
    fn test_ntag_family_by_version() {
        for (tag, card_type, size) in [
            (EmulatedTag::ntag213(), CardType::Ntag213, 180),
            (EmulatedTag::ntag215(), CardType::Ntag215, 504),
            (EmulatedTag::ntag216(), CardType::Ntag216, 888),
        ] {
            let identity = identify_tag(tag.clone());
            assert_eq!(identity.profile, CardProfile::new(card_type, size));
            assert_eq!(identity.protocol, Protocol::NfcA);
            assert_eq!(hex::encode(&identity.uid), NTAG_UID);
            // settled by the first GET_VERSION
            assert_eq!(tag.log(), ["FFCA000000", "FF000000026000"]);
        }
    }

    #[test]
    fn test_plain_ultralight_by_atr() {
        let tag = EmulatedTag::ultralight();
        let identity = identify_tag(tag.clone());
        assert_eq!(
            identity.profile,
            CardProfile::new(CardType::MifareUltralight, 64)
        );
        assert_eq!(
            tag.log()[1..],
            [
                "FF000000026000".to_string(),
                "FF0000000160".to_string(),
                "FFB0000110".to_string(),
                "FFB0000310".to_string(),
                "FF82000006FFFFFFFFFFFF".to_string(),
                "FF860000050100006000".to_string(),
            ]
        );
    }

    #[test]
    fn test_formatted_ultralight_by_cc() {
        let tag = EmulatedTag::ultralight();
        tag.write_memory(12, &[0xE1, 0x10, 0x06, 0x00]);
        assert_eq!(
            identify_tag(tag).profile,
            CardProfile::new(CardType::MifareUltralight, 48)
        );
    }

    #[test]
    fn test_unknown_cc_size_is_not_plain_ultralight() {
        let tag = EmulatedTag::ultralight();
        tag.write_memory(12, &[0xE1, 0x10, 0x20, 0x00]);
        assert_eq!(identify_tag(tag).profile, CardProfile::unknown());
    }

    #[test]
    fn test_classic_by_probe() {
        let identity = identify_tag(EmulatedTag::classic_1k());
        assert_eq!(
            identity.profile,
            CardProfile::new(CardType::MifareClassic, 1024)
        );
        assert_eq!(identity.uid.len(), 4);
    }

    #[test]
    fn test_classic_by_atr_when_probe_fails() {
        let tag = EmulatedTag::classic_1k();
        tag.set_sector_keys(0, [0x01; 6], [0x02; 6]);
        assert_eq!(
            identify_tag(tag).profile,
            CardProfile::new(CardType::MifareClassic, 1024)
        );
    }

    #[test]
    fn test_icode_slix_by_uid() {
        let identity = identify_tag(EmulatedTag::icode_slix());
        assert_eq!(identity.profile, CardProfile::new(CardType::IcodeSlix, 896));
        assert_eq!(identity.protocol, Protocol::NfcV);
    }

    #[test]
    fn test_generic_iso15693() {
        let mut card = ScriptedCard::new(|_| Ok(vec![0x6A, 0x81])).with_atr(ISO15693_ATR);
        let atr = Atr::new(card.atr().unwrap());
        let profile = detect(&mut card, &atr, &hex::decode("8039156608010416").unwrap());
        assert_eq!(profile, CardProfile::new(CardType::Iso15693, 1024));
    }

    #[test]
    fn test_garbage_version_is_rejected() {
        // header byte 01 on the first encoding, a genuine NTAG215 on the second
        let mut card = ScriptedCard::new(|command| {
            Ok(match command {
                [0xFF, 0x00, 0x00, 0x00, 0x02, ..] => hex::decode("01040402010011039000").unwrap(),
                [0xFF, 0x00, 0x00, 0x00, 0x01, ..] => hex::decode("00040402010011039000").unwrap(),
                _ => vec![0x6A, 0x81],
            })
        })
        .with_atr(NTAG_ATR);
        let atr = Atr::new(card.atr().unwrap());

        let started = std::time::Instant::now();
        let profile = detect(&mut card, &atr, &[0x04; 7]);
        assert_eq!(profile, CardProfile::new(CardType::Ntag215, 504));
        assert_eq!(card.sent().len(), 2);
        // the first exchange completed, so no settle delay
        assert!(started.elapsed() < GET_VERSION_SETTLE);
    }

    #[test]
    fn test_settle_delay_after_failed_exchange() {
        let mut card = ScriptedCard::new(|command| {
            Ok(match command {
                [0xFF, 0x00, 0x00, 0x00, 0x01, ..] => hex::decode("00040402010013039000").unwrap(),
                _ => vec![0x63, 0x00],
            })
        })
        .with_atr(NTAG_ATR);
        let atr = Atr::new(card.atr().unwrap());

        let started = std::time::Instant::now();
        let profile = detect(&mut card, &atr, &[0x04; 7]);
        assert_eq!(profile.card_type, CardType::Ntag216);
        assert!(started.elapsed() >= GET_VERSION_SETTLE);
    }

    #[test]
    fn test_ntag_cc_accepted_after_version_answered() {
        // GET_VERSION answers with an unknown product, the CC names NTAG213
        let mut card = ScriptedCard::new(|command| {
            Ok(match command {
                [0xFF, 0x00, ..] => hex::decode("00040902010011039000").unwrap(),
                [0xFF, 0xB0, 0x00, 0x01, 0x10] => {
                    hex::decode("0442488a837280d6e1101200000000009000").unwrap()
                }
                _ => vec![0x6A, 0x81],
            })
        })
        .with_atr(NTAG_ATR);
        let atr = Atr::new(card.atr().unwrap());
        assert_eq!(
            detect(&mut card, &atr, &[0x04; 7]),
            CardProfile::new(CardType::Ntag213, 180)
        );
    }

    #[test]
    fn test_page1_read_needs_whole_cc() {
        let scripted = |page1: &'static str| {
            ScriptedCard::new(move |command| {
                Ok(match command {
                    [0xFF, 0xB0, 0x00, 0x01, 0x10] => hex::decode(page1).unwrap(),
                    _ => vec![0x6A, 0x81],
                })
            })
            .with_atr(NTAG_ATR)
        };

        let mut card = scripted("0442488a837280d6e11012009000");
        let atr = Atr::new(card.atr().unwrap());
        assert_eq!(
            detect(&mut card, &atr, &[0x04; 7]),
            CardProfile::new(CardType::Ntag213, 180)
        );

        // CC cut after three bytes
        let mut card = scripted("0442488a837280d6e110129000");
        assert_ne!(detect(&mut card, &atr, &[0x04; 7]).card_type, CardType::Ntag213);
    }

    #[test]
    fn test_unrecognised_card_is_unknown_and_writable() {
        let mut card = ScriptedCard::new(|_| Err(tapkit_apdu_core::TransportError::Transmission))
            .with_atr("3b8980014a434f5033315632324a");
        let atr = Atr::new(card.atr().unwrap());
        let profile = detect(&mut card, &atr, &[]);
        assert_eq!(profile, CardProfile::unknown());
        assert!(profile.writable);
        assert_eq!(profile.size, 0);
    }

    #[test]
    fn test_detection_is_deterministic() {
        let tag = EmulatedTag::ntag215();
        let first = identify_tag(tag.clone());
        let second = identify_tag(tag);
        assert_eq!(first, second);
    }
}
