//! NDEF messages: ordered record sequences

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::error::{NdefError, Result};
use crate::record::{NdefRecord, RecordHeader, Tnf};

/// An NDEF message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NdefMessage {
    /// Records in message order
    pub records: Vec<NdefRecord>,
}

impl NdefMessage {
    /// Create a message from records
    pub const fn new(records: Vec<NdefRecord>) -> Self {
        Self { records }
    }

    /// Encode the message
    ///
    /// Only the first record carries MB and only the last carries ME.
    pub fn to_bytes(&self) -> Result<Bytes> {
        if self.records.is_empty() {
            return Err(NdefError::EmptyMessage);
        }
        if let Some(record) = self.records.iter().find(|r| r.record_type.len() > 255) {
            return Err(NdefError::TypeTooLong(record.record_type.len()));
        }

        let mut buf = BytesMut::new();
        let last = self.records.len() - 1;
        for (index, record) in self.records.iter().enumerate() {
            record.encode_into(&mut buf, index == 0, index == last);
        }
        Ok(buf.freeze())
    }

    /// Decode every record up to and including the one flagged ME
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let records = RecordIter::new(data)
            .map(|item| item.map(|(_, record)| record))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { records })
    }
}

/// Iterator over the records of an encoded message, yielding each header alongside
/// its record
///
/// Iteration ends after the record flagged ME, at the end of the buffer, or at the
/// first zero byte in header position (padding after a message that lost its ME).
#[derive(Debug, Clone)]
pub struct RecordIter<'a> {
    data: &'a [u8],
    offset: usize,
    done: bool,
}

impl<'a> RecordIter<'a> {
    /// Iterate over the records in `data`
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: 0,
            done: false,
        }
    }

    fn take(&mut self, start: usize, len: usize) -> Result<&'a [u8]> {
        let end = self.offset + len;
        if end > self.data.len() {
            return Err(NdefError::Truncated {
                offset: start,
                needed: end - self.data.len(),
            });
        }
        let slice = &self.data[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn next_record(&mut self) -> Result<(RecordHeader, NdefRecord)> {
        let start = self.offset;
        let header = RecordHeader::from_byte(self.take(start, 1)?[0]);
        if header.chunked || header.tnf == Tnf::Unchanged {
            return Err(NdefError::ChunkedRecord(start));
        }

        let type_len = usize::from(self.take(start, 1)?[0]);
        let payload_len = if header.short_record {
            usize::from(self.take(start, 1)?[0])
        } else {
            let raw = self.take(start, 4)?;
            u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize
        };
        let id_len = if header.id_length_present {
            usize::from(self.take(start, 1)?[0])
        } else {
            0
        };

        let record_type = Bytes::copy_from_slice(self.take(start, type_len)?);
        self.take(start, id_len)?;
        let payload = Bytes::copy_from_slice(self.take(start, payload_len)?);

        trace!(
            offset = start,
            tnf = ?header.tnf,
            type_len,
            payload_len,
            "Decoded NDEF record"
        );

        Ok((
            header,
            NdefRecord {
                tnf: header.tnf,
                record_type,
                payload,
            },
        ))
    }
}

impl Iterator for RecordIter<'_> {
    type Item = Result<(RecordHeader, NdefRecord)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.data.len() || self.data[self.offset] == 0x00 {
            return None;
        }
        let item = self.next_record();
        match &item {
            Ok((header, _)) => self.done = header.message_end,
            Err(_) => self.done = true,
        }
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed_records(count: usize) -> Vec<NdefRecord> {
        (0..count)
            .map(|i| match i % 3 {
                0 => NdefRecord::text("en", &format!("record {i}")),
                1 => NdefRecord::uri(&format!("https://example.com/{i}")),
                _ => NdefRecord::mime("application/json", format!("{{\"n\":{i}}}").into_bytes()),
            })
            .collect()
    }

    #[test]
    fn test_round_trip_preserves_records_and_order() {
        for count in 1..=8 {
            let message = NdefMessage::new(mixed_records(count));
            let encoded = message.to_bytes().unwrap();
            assert_eq!(NdefMessage::from_bytes(&encoded).unwrap(), message);
        }
    }

    #[test]
    fn test_only_first_and_last_carry_mb_me() {
        let encoded = NdefMessage::new(mixed_records(5)).to_bytes().unwrap();
        let headers: Vec<RecordHeader> = RecordIter::new(&encoded)
            .map(|item| item.unwrap().0)
            .collect();

        assert_eq!(headers.len(), 5);
        for (index, header) in headers.iter().enumerate() {
            assert_eq!(header.message_begin, index == 0);
            assert_eq!(header.message_end, index == 4);
        }
    }

    #[test]
    fn test_single_record_has_both_flags() {
        let encoded = NdefMessage::new(vec![NdefRecord::text("en", "x")])
            .to_bytes()
            .unwrap();
        let (header, _) = RecordIter::new(&encoded).next().unwrap().unwrap();
        assert!(header.message_begin && header.message_end);
    }

    #[test]
    fn test_long_payload_round_trip() {
        let message = NdefMessage::new(vec![
            NdefRecord::mime("application/octet-stream", vec![0x5A; 1500]),
            NdefRecord::uri("tel:+3100000000"),
        ]);
        let encoded = message.to_bytes().unwrap();
        assert_eq!(NdefMessage::from_bytes(&encoded).unwrap(), message);
    }

    #[test]
    fn test_stops_at_message_end_and_ignores_padding() {
        let mut encoded = NdefMessage::new(mixed_records(2))
            .to_bytes()
            .unwrap()
            .to_vec();
        encoded.extend_from_slice(&[0x00; 12]);
        assert_eq!(NdefMessage::from_bytes(&encoded).unwrap().records.len(), 2);
    }

    #[test]
    fn test_skips_id_field() {
        // MB|ME|SR|IL, well-known, type "T", payload 3, id 2
        let data = [0xD9, 0x01, 0x03, 0x02, b'T', b'i', b'd', 0x00, b'h', b'i'];
        let message = NdefMessage::from_bytes(&data).unwrap();
        assert_eq!(message.records[0].payload.as_ref(), b"\x00hi");
    }

    #[test]
    fn test_truncated_and_chunked_records_are_errors() {
        assert!(matches!(
            NdefMessage::from_bytes(&[0xD1, 0x01, 0x05, b'T', 0x02]),
            Err(NdefError::Truncated { offset: 0, .. })
        ));
        assert_eq!(
            NdefMessage::from_bytes(&[0xB1, 0x01, 0x00, b'T']),
            Err(NdefError::ChunkedRecord(0))
        );
    }

    #[test]
    fn test_empty_message_rejected_on_encode() {
        assert_eq!(NdefMessage::default().to_bytes(), Err(NdefError::EmptyMessage));
        assert!(NdefMessage::from_bytes(&[]).unwrap().records.is_empty());
    }
}
