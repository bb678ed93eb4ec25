//! Building NDEF messages from application payloads

use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use tapkit_ndef::{MIME_JSON, MIME_OCTET_STREAM, NdefMessage, NdefRecord};

use crate::error::{Error, Result};

/// Language written into text records
const TEXT_LANGUAGE: &str = "en";

/// How the bytes handed to `write_data` are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum PayloadType {
    /// `application/json` record
    #[display("json")]
    Json,
    /// UTF-8 text record
    #[display("text")]
    Text,
    /// `application/octet-stream` record
    #[display("binary")]
    Binary,
    /// URI record
    #[display("url")]
    Url,
}

impl FromStr for PayloadType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            "binary" => Ok(Self::Binary),
            "url" => Ok(Self::Url),
            other => Err(Error::InvalidInput {
                field: "data type",
                reason: format!("unsupported data type {other:?} (use json, text, binary or url)"),
            }),
        }
    }
}

fn utf8<'a>(field: &'static str, data: &'a [u8]) -> Result<&'a str> {
    std::str::from_utf8(data).map_err(|e| Error::InvalidInput {
        field,
        reason: e.to_string(),
    })
}

fn data_record(data: &[u8], payload_type: PayloadType) -> Result<NdefRecord> {
    Ok(match payload_type {
        PayloadType::Json => NdefRecord::mime(MIME_JSON, data.to_vec()),
        PayloadType::Text => NdefRecord::text(TEXT_LANGUAGE, utf8("data", data)?),
        PayloadType::Binary => NdefRecord::mime(MIME_OCTET_STREAM, data.to_vec()),
        PayloadType::Url => NdefRecord::uri(utf8("data", data)?),
    })
}

/// Message for `data` and an optional URL
///
/// With a URL the message starts with a URI record, followed by a data record when
/// `data` is not empty. In that case a data type other than json, text or binary
/// stores the data as text. Without a URL the data type must be one of the four
/// known ones.
pub fn data_message(data: &[u8], data_type: &str, url: Option<&str>) -> Result<NdefMessage> {
    let url = url.filter(|url| !url.is_empty());

    let records = match url {
        Some(url) if data.is_empty() => vec![NdefRecord::uri(url)],
        Some(url) => {
            let payload_type = match data_type.parse() {
                Ok(PayloadType::Url) | Err(_) => PayloadType::Text,
                Ok(payload_type) => payload_type,
            };
            vec![NdefRecord::uri(url), data_record(data, payload_type)?]
        }
        None if data.is_empty() => {
            return Err(Error::InvalidInput {
                field: "data",
                reason: "nothing to write".to_string(),
            });
        }
        None => vec![data_record(data, data_type.parse()?)?],
    };

    Ok(NdefMessage::new(records))
}

/// Kind of one record in a multi-record write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// URI record
    Url,
    /// UTF-8 text record
    Text,
    /// `application/json` record
    Json,
    /// `application/octet-stream` record from hex data
    Binary,
    /// Media-type record of any type
    Mime,
}

/// One record of a multi-record write, as callers describe it in JSON
///
/// ```json
/// { "type": "mime", "mimeType": "application/cbor", "dataType": "binary", "data": "oQFi" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordInput {
    /// Record kind
    #[serde(rename = "type")]
    pub kind: RecordKind,
    /// Record data: hex for `binary`, base64 for binary `mime`, text otherwise
    pub data: String,
    /// Media type of a `mime` record, required for that kind
    #[serde(default)]
    pub mime_type: Option<String>,
    /// `binary` when the data of a `mime` record is base64
    #[serde(default)]
    pub data_type: Option<String>,
}

impl RecordInput {
    /// Record of the given kind
    pub fn new(kind: RecordKind, data: impl Into<String>) -> Self {
        Self {
            kind,
            data: data.into(),
            mime_type: None,
            data_type: None,
        }
    }

    /// Media-type record
    pub fn mime(mime_type: impl Into<String>, data: impl Into<String>, base64: bool) -> Self {
        Self {
            kind: RecordKind::Mime,
            data: data.into(),
            mime_type: Some(mime_type.into()),
            data_type: base64.then(|| "binary".to_string()),
        }
    }

    /// Encode as an NDEF record; `index` names the record in errors
    pub fn to_record(&self, index: usize) -> Result<NdefRecord> {
        let invalid = |reason: String| Error::InvalidInput {
            field: "records",
            reason: format!("record {index}: {reason}"),
        };

        Ok(match self.kind {
            RecordKind::Url => NdefRecord::uri(&self.data),
            RecordKind::Text => NdefRecord::text(TEXT_LANGUAGE, &self.data),
            RecordKind::Json => NdefRecord::mime(MIME_JSON, self.data.clone().into_bytes()),
            RecordKind::Binary => {
                let bytes = hex::decode(&self.data)
                    .map_err(|e| invalid(format!("invalid hex data: {e}")))?;
                NdefRecord::mime(MIME_OCTET_STREAM, bytes)
            }
            RecordKind::Mime => {
                let mime_type = self
                    .mime_type
                    .as_deref()
                    .filter(|mime_type| !mime_type.is_empty())
                    .ok_or_else(|| invalid("mimeType required for mime record".to_string()))?;
                let payload = if self.data_type.as_deref() == Some("binary") {
                    STANDARD
                        .decode(&self.data)
                        .map_err(|e| invalid(format!("invalid base64 data: {e}")))?
                } else {
                    self.data.clone().into_bytes()
                };
                NdefRecord::mime(mime_type, payload)
            }
        })
    }
}

/// Message holding every record of `inputs`, in order
pub fn records_message(inputs: &[RecordInput]) -> Result<NdefMessage> {
    if inputs.is_empty() {
        return Err(Error::InvalidInput {
            field: "records",
            reason: "no records to write".to_string(),
        });
    }

    let records = inputs
        .iter()
        .enumerate()
        .map(|(index, input)| input.to_record(index))
        .collect::<Result<Vec<_>>>()?;
    Ok(NdefMessage::new(records))
}
