// Package model provides stored payload framing and compression.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::bytes;

use super::value::Value;
use super::value_decoder::{decode_lenient, CodecError};
use super::value_encoder::encode_value;

/// Fixed framing header: three magic bytes plus a format version.
pub const PAYLOAD_HEADER_LEN: usize = 4;
const PAYLOAD_MAGIC: [u8; 3] = *b"WTC";
const FORMAT_VERSION: u8 = 1;

/// Encoded bodies shorter than this are stored raw, never gzipped.
pub const COMPRESS_MIN_LEN: usize = 64;

/// Leading bytes of every gzip stream.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Serializes a value into a framed payload: 4-byte header followed by
/// the gzip stream of the binary form, or the raw binary form when it is
/// below the compression threshold. Runs without any shard lock held.
pub fn encode_payload(value: &Value) -> Result<Vec<u8>, CodecError> {
    let mut scratch = bytes::get_buf();
    encode_value(&mut scratch, value);

    let mut out = Vec::with_capacity(PAYLOAD_HEADER_LEN + scratch.len());
    out.extend_from_slice(&PAYLOAD_MAGIC);
    out.push(FORMAT_VERSION);

    if scratch.len() >= COMPRESS_MIN_LEN {
        let mut encoder = GzEncoder::new(&mut out, Compression::default());
        encoder.write_all(&scratch)?;
        encoder.finish()?;
    } else {
        out.extend_from_slice(&scratch);
    }

    bytes::put_buf(scratch);
    Ok(out)
}

/// Decodes a framed payload produced by `encode_payload`.
/// The body is a gzip stream iff it starts with the gzip magic bytes;
/// otherwise it is decoded in place.
pub fn decode_payload(payload: &[u8]) -> Result<Value, CodecError> {
    if payload.len() < PAYLOAD_HEADER_LEN
        || payload[..3] != PAYLOAD_MAGIC
        || payload[3] != FORMAT_VERSION
    {
        return Err(CodecError::BadHeader);
    }

    let body = &payload[PAYLOAD_HEADER_LEN..];
    if body.len() >= 2 && body[..2] == GZIP_MAGIC {
        let mut scratch = bytes::get_buf();
        let result = GzDecoder::new(body)
            .read_to_end(&mut scratch)
            .map_err(CodecError::Gzip)
            .and_then(|_| decode_lenient(&scratch));
        bytes::put_buf(scratch);
        return result;
    }
    decode_lenient(body)
}

/// Reports whether a framed payload carries a gzip body.
pub fn is_compressed(payload: &[u8]) -> bool {
    payload.len() >= PAYLOAD_HEADER_LEN + 2
        && payload[PAYLOAD_HEADER_LEN..PAYLOAD_HEADER_LEN + 2] == GZIP_MAGIC
}
