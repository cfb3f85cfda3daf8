// Package model provides value decoding functionality.

use std::collections::BTreeMap;

use byteorder::{ByteOrder, LittleEndian};

use super::value::Value;
use super::value_encoder::{
    TAG_BOOL, TAG_BYTES, TAG_FLOAT, TAG_INT, TAG_MAP, TAG_NIL, TAG_SEQ, TAG_STR, TAG_UINT,
};

/// Sequences and maps larger than this are treated as corrupt.
const MAX_CONTAINER_LEN: u32 = 1 << 28;

/// Nesting deeper than this is treated as corrupt rather than risking
/// the stack.
const MAX_DEPTH: usize = 64;

/// CodecError covers every way a stored payload can fail to decode.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("payload truncated")]
    UnexpectedEof,
    #[error("unknown value tag {0}")]
    BadTag(u8),
    #[error("length field out of range")]
    BadLength,
    #[error("trailing bytes after value")]
    TrailingBytes,
    #[error("payload header mismatch")]
    BadHeader,
    #[error("gzip stream: {0}")]
    Gzip(#[from] std::io::Error),
    #[error("invalid utf-8 in string")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Decodes the canonical binary form, requiring full consumption.
pub fn decode_value(buf: &[u8]) -> Result<Value, CodecError> {
    let mut reader = Reader::new(buf);
    let value = reader.read_value(0)?;
    if !reader.is_empty() {
        return Err(CodecError::TrailingBytes);
    }
    Ok(value)
}

/// Decodes an encoded body with the tiered strategy: the tagged binary
/// form first, then a bare fixed-width scalar, then a raw-string fallback
/// parsed into bool, signed integer, unsigned integer, float, or string.
pub fn decode_lenient(buf: &[u8]) -> Result<Value, CodecError> {
    match decode_value(buf) {
        Ok(v) => return Ok(v),
        Err(CodecError::Utf8(e)) => return Err(CodecError::Utf8(e)),
        Err(_) => {}
    }
    if let Some(v) = decode_bare_scalar(buf) {
        return Ok(v);
    }
    decode_raw_text(buf)
}

/// Decodes an untagged fixed-width scalar: one byte is a boolean,
/// eight bytes a little-endian signed integer.
fn decode_bare_scalar(buf: &[u8]) -> Option<Value> {
    match buf.len() {
        1 if buf[0] <= 1 => Some(Value::Bool(buf[0] == 1)),
        8 => Some(Value::Int(LittleEndian::read_u64(buf) as i64)),
        _ => None,
    }
}

/// Interprets the body as UTF-8 text and parses it into the narrowest
/// primitive that accepts it.
fn decode_raw_text(buf: &[u8]) -> Result<Value, CodecError> {
    let text = std::str::from_utf8(buf)?;
    if text == "true" {
        return Ok(Value::Bool(true));
    }
    if text == "false" {
        return Ok(Value::Bool(false));
    }
    if let Ok(n) = text.parse::<i64>() {
        return Ok(Value::Int(n));
    }
    if let Ok(n) = text.parse::<u64>() {
        return Ok(Value::Uint(n));
    }
    if let Ok(f) = text.parse::<f64>() {
        return Ok(Value::Float(f));
    }
    Ok(Value::Str(text.to_string()))
}

/// Reader walks a byte slice without copying.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn read_value(&mut self, depth: usize) -> Result<Value, CodecError> {
        if depth > MAX_DEPTH {
            return Err(CodecError::BadLength);
        }
        let tag = self.read_u8()?;
        match tag {
            TAG_NIL => Ok(Value::Nil),
            TAG_BOOL => Ok(Value::Bool(self.read_u8()? != 0)),
            TAG_INT => Ok(Value::Int(self.read_u64()? as i64)),
            TAG_UINT => Ok(Value::Uint(self.read_u64()?)),
            TAG_FLOAT => Ok(Value::Float(f64::from_bits(self.read_u64()?))),
            TAG_STR => {
                let len = self.read_len()?;
                let bytes = self.read_bytes(len)?;
                Ok(Value::Str(std::str::from_utf8(bytes)?.to_string()))
            }
            TAG_BYTES => {
                let len = self.read_len()?;
                Ok(Value::Bytes(self.read_bytes(len)?.to_vec()))
            }
            TAG_SEQ => {
                let count = self.read_container_len()?;
                let mut items = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    items.push(self.read_value(depth + 1)?);
                }
                Ok(Value::Seq(items))
            }
            TAG_MAP => {
                let count = self.read_container_len()?;
                let mut entries = BTreeMap::new();
                for _ in 0..count {
                    let klen = self.read_len()?;
                    let key = std::str::from_utf8(self.read_bytes(klen)?)?.to_string();
                    let val = self.read_value(depth + 1)?;
                    entries.insert(key, val);
                }
                Ok(Value::Map(entries))
            }
            other => Err(CodecError::BadTag(other)),
        }
    }

    fn read_u8(&mut self) -> Result<u8, CodecError> {
        if self.pos >= self.buf.len() {
            return Err(CodecError::UnexpectedEof);
        }
        let b = self.buf[self.pos];
        self.pos += 1;
        Ok(b)
    }

    fn read_u64(&mut self) -> Result<u64, CodecError> {
        let bytes = self.read_bytes(8)?;
        Ok(LittleEndian::read_u64(bytes))
    }

    fn read_len(&mut self) -> Result<usize, CodecError> {
        let bytes = self.read_bytes(4)?;
        let len = LittleEndian::read_u32(bytes) as usize;
        if len > self.buf.len() - self.pos {
            return Err(CodecError::BadLength);
        }
        Ok(len)
    }

    fn read_container_len(&mut self) -> Result<usize, CodecError> {
        let bytes = self.read_bytes(4)?;
        let count = LittleEndian::read_u32(bytes);
        if count > MAX_CONTAINER_LEN {
            return Err(CodecError::BadLength);
        }
        Ok(count as usize)
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if len > self.buf.len() - self.pos {
            return Err(CodecError::UnexpectedEof);
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }
}
