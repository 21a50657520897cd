//! Spool file format
//!
//! ```text
//! header:  b"SFWB" | version: u16 BE
//! entry:   payload_len: u32 BE | crc32(payload): u32 BE | payload
//! payload: field_count: u32 BE | field*
//! field:   tag: u8 | body
//!            0 text     len: u32 BE | utf-8 bytes
//!            1 integer  i64 BE
//!            2 number   f64 bits BE
//!            3 boolean  u8 (0 | 1)
//! ```

use crate::error::{SinkError, SinkResult};
use crate::record::{CellValue, Record};
use std::io::{BufRead, Read, Write};

pub const MAGIC: &[u8; 4] = b"SFWB";
pub const VERSION: u16 = 1;
pub const HEADER_LEN: u64 = 6;

/// Upper bound for a single entry payload. Enforced on encode, so anything
/// larger found while reading is corruption.
pub const MAX_ENTRY_LEN: usize = 64 * 1024 * 1024;

const TAG_TEXT: u8 = 0;
const TAG_INTEGER: u8 = 1;
const TAG_NUMBER: u8 = 2;
const TAG_BOOLEAN: u8 = 3;

pub fn write_header<W: Write>(writer: &mut W) -> SinkResult<()> {
    writer.write_all(MAGIC)?;
    writer.write_all(&VERSION.to_be_bytes())?;
    Ok(())
}

pub fn read_header<R: Read>(reader: &mut R) -> SinkResult<()> {
    let mut header = [0u8; HEADER_LEN as usize];
    reader.read_exact(&mut header)?;

    if &header[0..4] != MAGIC {
        return Err(SinkError::CorruptedBuffer {
            position: 0,
            reason: "bad magic".to_string(),
        });
    }
    let version = u16::from_be_bytes([header[4], header[5]]);
    if version != VERSION {
        return Err(SinkError::CorruptedBuffer {
            position: 4,
            reason: format!("unsupported spool version {}", version),
        });
    }
    Ok(())
}

/// Encode one record as a complete entry (length, checksum, payload).
///
/// Records whose payload would exceed [`MAX_ENTRY_LEN`] are rejected here,
/// so every entry that reaches the spool can be read back.
pub fn encode_record(record: &Record) -> SinkResult<Vec<u8>> {
    let field_count = u32::try_from(record.len()).map_err(|_| too_large(record.len()))?;

    let mut payload = Vec::with_capacity(4 + record.len() * 9);
    payload.extend_from_slice(&field_count.to_be_bytes());

    for cell in record.cells() {
        match cell {
            CellValue::Text(s) => {
                if payload.len() + 5 + s.len() > MAX_ENTRY_LEN {
                    return Err(too_large(payload.len() + 5 + s.len()));
                }
                payload.push(TAG_TEXT);
                payload.extend_from_slice(&(s.len() as u32).to_be_bytes());
                payload.extend_from_slice(s.as_bytes());
            }
            CellValue::Integer(i) => {
                payload.push(TAG_INTEGER);
                payload.extend_from_slice(&i.to_be_bytes());
            }
            CellValue::Number(f) => {
                payload.push(TAG_NUMBER);
                payload.extend_from_slice(&f.to_bits().to_be_bytes());
            }
            CellValue::Boolean(b) => {
                payload.push(TAG_BOOLEAN);
                payload.push(u8::from(*b));
            }
        }
    }

    if payload.len() > MAX_ENTRY_LEN {
        return Err(too_large(payload.len()));
    }

    let mut entry = Vec::with_capacity(8 + payload.len());
    entry.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    entry.extend_from_slice(&crc32fast::hash(&payload).to_be_bytes());
    entry.extend_from_slice(&payload);
    Ok(entry)
}

fn too_large(size: usize) -> SinkError {
    SinkError::InvalidRecord(format!(
        "record needs {} bytes in the write buffer, limit is {}",
        size, MAX_ENTRY_LEN
    ))
}

/// Read the next entry starting at byte `position`.
///
/// Returns `Ok(None)` at a clean end of file, and the record together with
/// the number of bytes consumed otherwise.
pub fn read_record<R: BufRead>(reader: &mut R, position: u64) -> SinkResult<Option<(Record, u64)>> {
    if reader.fill_buf()?.is_empty() {
        return Ok(None);
    }

    let mut prefix = [0u8; 8];
    reader.read_exact(&mut prefix).map_err(|e| truncated(e, position))?;
    let length = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    let checksum = u32::from_be_bytes([prefix[4], prefix[5], prefix[6], prefix[7]]);

    if length > MAX_ENTRY_LEN {
        return Err(SinkError::CorruptedBuffer {
            position,
            reason: format!("entry length too large: {} bytes", length),
        });
    }

    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload).map_err(|e| truncated(e, position))?;

    if crc32fast::hash(&payload) != checksum {
        return Err(SinkError::CorruptedBuffer {
            position,
            reason: "checksum mismatch".to_string(),
        });
    }

    let record = decode_payload(&payload, position)?;
    Ok(Some((record, 8 + length as u64)))
}

fn truncated(err: std::io::Error, position: u64) -> SinkError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        SinkError::CorruptedBuffer {
            position,
            reason: "truncated entry".to_string(),
        }
    } else {
        SinkError::Io(err)
    }
}

fn decode_payload(payload: &[u8], position: u64) -> SinkResult<Record> {
    let mut cursor = PayloadCursor {
        bytes: payload,
        at: 0,
        position,
    };

    let field_count = u32::from_be_bytes(cursor.take_array()?);
    let mut cells = Vec::with_capacity(field_count as usize);

    for _ in 0..field_count {
        let [tag] = cursor.take_array::<1>()?;
        let cell = match tag {
            TAG_TEXT => {
                let len = u32::from_be_bytes(cursor.take_array()?) as usize;
                let bytes = cursor.take(len)?;
                let text = std::str::from_utf8(bytes).map_err(|e| cursor.corrupt(e.to_string()))?;
                CellValue::Text(text.to_string())
            }
            TAG_INTEGER => CellValue::Integer(i64::from_be_bytes(cursor.take_array()?)),
            TAG_NUMBER => CellValue::Number(f64::from_bits(u64::from_be_bytes(cursor.take_array()?))),
            TAG_BOOLEAN => {
                let [b] = cursor.take_array::<1>()?;
                CellValue::Boolean(b != 0)
            }
            other => return Err(cursor.corrupt(format!("unknown field tag {}", other))),
        };
        cells.push(cell);
    }

    if cursor.at != payload.len() {
        return Err(cursor.corrupt("trailing bytes after last field".to_string()));
    }

    Ok(Record::new(cells))
}

struct PayloadCursor<'a> {
    bytes: &'a [u8],
    at: usize,
    position: u64,
}

impl<'a> PayloadCursor<'a> {
    fn take(&mut self, len: usize) -> SinkResult<&'a [u8]> {
        let end = self
            .at
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| self.corrupt("field runs past end of entry".to_string()))?;
        let bytes: &'a [u8] = self.bytes;
        let slice = &bytes[self.at..end];
        self.at = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> SinkResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn corrupt(&self, reason: String) -> SinkError {
        SinkError::CorruptedBuffer {
            position: self.position,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> Record {
        Record::new(vec![
            CellValue::Text("héllo, 'world'\n".into()),
            CellValue::Integer(-42),
            CellValue::Number(3.25),
            CellValue::Boolean(true),
            CellValue::Text(String::new()),
        ])
    }

    #[test]
    fn test_entry_roundtrip() {
        let entry = encode_record(&sample()).unwrap();
        let mut reader = Cursor::new(entry.clone());

        let (record, consumed) = read_record(&mut reader, 0).unwrap().unwrap();
        assert_eq!(record, sample());
        assert_eq!(consumed, entry.len() as u64);
        assert!(read_record(&mut reader, consumed).unwrap().is_none());
    }

    #[test]
    fn test_header_roundtrip_and_bad_magic() {
        let mut bytes = Vec::new();
        write_header(&mut bytes).unwrap();
        assert_eq!(bytes.len() as u64, HEADER_LEN);
        read_header(&mut Cursor::new(bytes)).unwrap();

        let err = read_header(&mut Cursor::new(b"NOPE\x00\x01".to_vec())).unwrap_err();
        assert!(matches!(err, SinkError::CorruptedBuffer { .. }));
    }

    #[test]
    fn test_checksum_mismatch_is_detected() {
        let mut entry = encode_record(&sample()).unwrap();
        let last = entry.len() - 1;
        entry[last] ^= 0xFF;

        let err = read_record(&mut Cursor::new(entry), 6).unwrap_err();
        match err {
            SinkError::CorruptedBuffer { position, reason } => {
                assert_eq!(position, 6);
                assert!(reason.contains("checksum"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_truncated_entry_is_detected() {
        let entry = encode_record(&sample()).unwrap();
        let truncated = entry[..entry.len() - 3].to_vec();

        let err = read_record(&mut Cursor::new(truncated), 0).unwrap_err();
        assert!(matches!(err, SinkError::CorruptedBuffer { .. }));
    }

    #[test]
    fn test_oversized_record_is_rejected_on_encode() {
        let oversized = Record::new(vec![
            CellValue::Integer(1),
            CellValue::Text("x".repeat(MAX_ENTRY_LEN)),
        ]);
        assert!(matches!(
            encode_record(&oversized),
            Err(SinkError::InvalidRecord(_))
        ));

        let at_limit = Record::new(vec![CellValue::Text("x".repeat(MAX_ENTRY_LEN - 9))]);
        let entry = encode_record(&at_limit).unwrap();
        let (record, _) = read_record(&mut Cursor::new(entry), 0).unwrap().unwrap();
        assert_eq!(record, at_limit);
    }
}
