// Package model provides value encoding functionality.

use byteorder::{ByteOrder, LittleEndian};

use super::value::Value;

/// Value tag constants of the binary form.
pub const TAG_NIL: u8 = 0;
pub const TAG_BOOL: u8 = 1;
pub const TAG_INT: u8 = 2;
pub const TAG_UINT: u8 = 3;
pub const TAG_FLOAT: u8 = 4;
pub const TAG_STR: u8 = 5;
pub const TAG_BYTES: u8 = 6;
pub const TAG_SEQ: u8 = 7;
pub const TAG_MAP: u8 = 8;

/// Appends the canonical binary form of a value to the buffer.
/// The form is one tag byte followed by little-endian scalar bytes or a
/// little-endian u32 length plus the element bytes.
pub fn encode_value(dst: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Nil => dst.push(TAG_NIL),
        Value::Bool(b) => {
            dst.push(TAG_BOOL);
            dst.push(u8::from(*b));
        }
        Value::Int(n) => {
            dst.push(TAG_INT);
            append_u64(dst, *n as u64);
        }
        Value::Uint(n) => {
            dst.push(TAG_UINT);
            append_u64(dst, *n);
        }
        Value::Float(f) => {
            dst.push(TAG_FLOAT);
            append_u64(dst, f.to_bits());
        }
        Value::Str(s) => {
            dst.push(TAG_STR);
            append_u32(dst, s.len() as u32);
            dst.extend_from_slice(s.as_bytes());
        }
        Value::Bytes(b) => {
            dst.push(TAG_BYTES);
            append_u32(dst, b.len() as u32);
            dst.extend_from_slice(b);
        }
        Value::Seq(items) => {
            dst.push(TAG_SEQ);
            append_u32(dst, items.len() as u32);
            for item in items {
                encode_value(dst, item);
            }
        }
        Value::Map(entries) => {
            dst.push(TAG_MAP);
            append_u32(dst, entries.len() as u32);
            for (key, val) in entries {
                append_u32(dst, key.len() as u32);
                dst.extend_from_slice(key.as_bytes());
                encode_value(dst, val);
            }
        }
    }
}

/// Appends a little-endian uint32 to the buffer.
fn append_u32(dst: &mut Vec<u8>, v: u32) {
    let mut bytes = [0u8; 4];
    LittleEndian::write_u32(&mut bytes, v);
    dst.extend_from_slice(&bytes);
}

/// Appends a little-endian uint64 to the buffer.
fn append_u64(dst: &mut Vec<u8>, v: u64) {
    let mut bytes = [0u8; 8];
    LittleEndian::write_u64(&mut bytes, v);
    dst.extend_from_slice(&bytes);
}
