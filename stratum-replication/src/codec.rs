//! Binary wire codec for event batches.
//!
//! Layout, all integers big-endian, strings as u32 length + UTF-8 bytes:
//! event count, then per event: store name, operation name, argument
//! count, then per argument a one-byte type tag followed by the
//! type-specific encoding. The tag set mirrors [`ArgValue`] exhaustively;
//! adding a variant is a breaking wire change at both ends, and a reader
//! that meets an unknown tag fails the whole batch.

use crate::error::CodecError;
use stratum_types::{ArgValue, EntityRecord, EventBatch, MutationEvent, OpKind};

const TAG_TEXT: u8 = 0x01;
const TAG_LONG: u8 = 0x02;
const TAG_RECORD: u8 = 0x03;

/// Cap on any single length-prefixed field (16 MB).
const MAX_FIELD_SIZE: usize = 16 * 1024 * 1024;

/// Encodes a batch into its wire form.
pub fn encode_batch(batch: &EventBatch) -> Vec<u8> {
    let mut buf = Vec::new();
    write_u32(&mut buf, batch.len() as u32);
    for event in batch.iter() {
        write_string(&mut buf, &event.store);
        write_string(&mut buf, event.op.name());
        write_u32(&mut buf, event.args.len() as u32);
        for arg in &event.args {
            match arg {
                ArgValue::Text(s) => {
                    buf.push(TAG_TEXT);
                    write_string(&mut buf, s);
                }
                ArgValue::Long(v) => {
                    buf.push(TAG_LONG);
                    buf.extend_from_slice(&v.to_be_bytes());
                }
                ArgValue::Record(r) => {
                    buf.push(TAG_RECORD);
                    write_string(&mut buf, &r.key);
                    write_string(&mut buf, &r.payload);
                }
            }
        }
    }
    buf
}

/// Decodes a batch from its wire form. Any malformation — unknown tag,
/// unknown operation, truncation, trailing bytes — fails the whole batch.
pub fn decode_batch(bytes: &[u8]) -> Result<EventBatch, CodecError> {
    let mut reader = Reader::new(bytes);
    let count = reader.read_u32("event count")?;
    let mut batch = EventBatch::new();
    for _ in 0..count {
        let store = reader.read_string("store name")?;
        let op_name = reader.read_string("operation name")?;
        let op = OpKind::parse(&op_name).ok_or(CodecError::UnknownOperation(op_name))?;
        let arg_count = reader.read_u32("argument count")?;
        let mut args = Vec::new();
        for _ in 0..arg_count {
            let tag = reader.read_u8("type tag")?;
            let arg = match tag {
                TAG_TEXT => ArgValue::Text(reader.read_string("text value")?),
                TAG_LONG => ArgValue::Long(reader.read_i64("long value")?),
                TAG_RECORD => {
                    let key = reader.read_string("record key")?;
                    let payload = reader.read_string("record payload")?;
                    ArgValue::Record(EntityRecord::new(key, payload))
                }
                other => return Err(CodecError::UnknownTag(other)),
            };
            args.push(arg);
        }
        batch.push(MutationEvent::new(store, op, args));
    }
    if reader.remaining() != 0 {
        return Err(CodecError::TrailingData(reader.remaining()));
    }
    Ok(batch)
}

fn write_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    write_u32(buf, s.len() as u32);
    buf.extend_from_slice(s.as_bytes());
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], CodecError> {
        if self.remaining() < len {
            return Err(CodecError::Truncated(field));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_u8(&mut self, field: &'static str) -> Result<u8, CodecError> {
        Ok(self.take(1, field)?[0])
    }

    fn read_u32(&mut self, field: &'static str) -> Result<u32, CodecError> {
        let bytes = self.take(4, field)?;
        Ok(u32::from_be_bytes(bytes.try_into().expect("4-byte slice")))
    }

    fn read_i64(&mut self, field: &'static str) -> Result<i64, CodecError> {
        let bytes = self.take(8, field)?;
        Ok(i64::from_be_bytes(bytes.try_into().expect("8-byte slice")))
    }

    fn read_string(&mut self, field: &'static str) -> Result<String, CodecError> {
        let len = self.read_u32(field)? as usize;
        if len > MAX_FIELD_SIZE {
            return Err(CodecError::TooLarge(len));
        }
        let bytes = self.take(len, field)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8(field))
    }
}
