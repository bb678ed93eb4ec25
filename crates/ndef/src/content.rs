//! Flattening of decoded records into the url/data/data-type view applications use

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::NdefMessage;
use crate::record::{NdefRecord, Tnf};
use crate::{MIME_JSON, MIME_OCTET_STREAM};

/// Kind of application data found on (or destined for) a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// UTF-8 text record
    #[display("text")]
    Text,
    /// JSON document in an `application/json` record
    #[display("json")]
    Json,
    /// Opaque bytes in an `application/octet-stream` record, rendered as hex
    #[display("binary")]
    Binary,
    /// The tag only holds a URI
    #[display("url")]
    Url,
    /// Media type this codec does not interpret
    #[display("unknown")]
    Unknown,
}

/// Decoded records plus the url/data fields derived from them
///
/// Later records override data found in earlier ones. When a message carries a URI
/// but no data record, the URI doubles as the data with type [`DataType::Url`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NdefContent {
    /// Records in message order, payloads untouched
    pub records: Vec<NdefRecord>,
    /// URI from the last URI record
    pub url: Option<String>,
    /// Data from the last text or media-type record
    pub data: Option<String>,
    /// Kind of `data`
    pub data_type: Option<DataType>,
}

impl NdefContent {
    /// Decode an NDEF message (the value of the NDEF TLV)
    pub fn decode(message: &[u8]) -> Result<Self> {
        Ok(Self::from_records(NdefMessage::from_bytes(message)?.records))
    }

    /// Derive the url/data view from already decoded records
    pub fn from_records(records: Vec<NdefRecord>) -> Self {
        let mut content = Self::default();

        for record in &records {
            if let Some(uri) = record.as_uri() {
                content.url = Some(uri);
            } else if let Some((_, text)) = record.as_text() {
                content.set_data(text, DataType::Text);
            } else if record.tnf == Tnf::MediaType {
                let (data, data_type) = match record.record_type.as_ref() {
                    t if t == MIME_JSON.as_bytes() => (
                        String::from_utf8_lossy(&record.payload).into_owned(),
                        DataType::Json,
                    ),
                    t if t == MIME_OCTET_STREAM.as_bytes() => {
                        (hex::encode(&record.payload), DataType::Binary)
                    }
                    _ => (
                        String::from_utf8_lossy(&record.payload).into_owned(),
                        DataType::Unknown,
                    ),
                };
                content.set_data(data, data_type);
            }
        }

        if content.data.is_none() {
            if let Some(url) = &content.url {
                content.data = Some(url.clone());
                content.data_type = Some(DataType::Url);
            }
        }

        content.records = records;
        content
    }

    fn set_data(&mut self, data: String, data_type: DataType) {
        self.data = Some(data);
        self.data_type = Some(data_type);
    }

    /// True when the message carried nothing applications can use
    pub const fn is_empty(&self) -> bool {
        self.url.is_none() && self.data.is_none()
    }
}
