//! Payload encoding and decoding
//!
//! ## Encoding by kind
//! - string:            raw bytes, flags 0 (+COMPRESSED if requested)
//! - integer / boolean: decimal text, IS_LONG, never compressed
//! - float:             decimal text, IS_DOUBLE, never compressed
//! - structured:        codec bytes, SERIALIZED (+COMPRESSED if requested)
//!
//! Encoded buffers carry one trailing NUL byte for C-string consumers; it is
//! not part of `Payload::bytes()`.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::config::Config;
use crate::error::{MemlinkError, Result};

use super::compression::{decompress_with_unknown_size, Compressor, Lz4Compressor};
use super::structured::{BincodeCodec, StructuredCodec};
use super::{Flags, Value};

/// Encoded value: bytes plus type flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Encoded bytes followed by one NUL terminator
    buf: Bytes,
    flags: Flags,
}

impl Payload {
    fn new(mut data: Vec<u8>, flags: Flags) -> Self {
        data.reserve_exact(1);
        data.push(0);
        Self {
            buf: Bytes::from(data),
            flags,
        }
    }

    /// Encoded bytes, without the terminator
    pub fn bytes(&self) -> &[u8] {
        &self.buf[..self.len()]
    }

    /// Encoded bytes including the trailing NUL
    pub fn bytes_with_nul(&self) -> &[u8] {
        &self.buf
    }

    /// Logical length (terminator not counted)
    pub fn len(&self) -> usize {
        self.buf.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Cheap handle on the logical bytes
    pub fn to_bytes(&self) -> Bytes {
        self.buf.slice(..self.len())
    }
}

/// Value ⇄ payload transformer
///
/// Holds the pluggable compressor and structured codec.
#[derive(Clone)]
pub struct PayloadCodec {
    compressor: Arc<dyn Compressor>,
    structured: Arc<dyn StructuredCodec>,
    max_decompress_attempts: u32,
}

impl PayloadCodec {
    /// LZ4 + bincode with the default limits
    pub fn new() -> Self {
        Self {
            compressor: Arc::new(Lz4Compressor),
            structured: Arc::new(BincodeCodec::default()),
            max_decompress_attempts: 16,
        }
    }

    /// Codec honoring the payload settings of `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new()
            .with_structured(BincodeCodec::with_limit(config.max_structured_size))
            .with_max_decompress_attempts(config.max_decompress_attempts)
    }

    pub fn with_compressor(mut self, compressor: impl Compressor + 'static) -> Self {
        self.compressor = Arc::new(compressor);
        self
    }

    pub fn with_structured(mut self, codec: impl StructuredCodec + 'static) -> Self {
        self.structured = Arc::new(codec);
        self
    }

    pub fn with_max_decompress_attempts(mut self, attempts: u32) -> Self {
        self.max_decompress_attempts = attempts;
        self
    }

    pub fn max_decompress_attempts(&self) -> u32 {
        self.max_decompress_attempts
    }

    /// Encode a value
    ///
    /// `compress` is the connection's compression setting; scalars ignore it.
    pub fn encode(&self, value: &Value, compress: bool) -> Result<Payload> {
        let mut flags = if compress {
            Flags::COMPRESSED
        } else {
            Flags::empty()
        };

        let data = match value {
            Value::Str(bytes) => bytes.clone(),
            Value::Int(n) => {
                flags.remove(Flags::COMPRESSED);
                flags.insert(Flags::IS_LONG);
                n.to_string().into_bytes()
            }
            Value::Bool(b) => {
                flags.remove(Flags::COMPRESSED);
                flags.insert(Flags::IS_LONG);
                i64::from(*b).to_string().into_bytes()
            }
            Value::Float(f) => {
                flags.remove(Flags::COMPRESSED);
                flags.insert(Flags::IS_DOUBLE);
                f.to_string().into_bytes()
            }
            Value::Structured(s) => {
                let encoded = self.structured.encode(s).map_err(|e| {
                    tracing::warn!("could not serialize value: {}", e);
                    e
                })?;
                flags.insert(Flags::SERIALIZED);
                encoded
            }
        };

        if flags.contains(Flags::COMPRESSED) {
            let compressed = self.compressor.compress(&data).map_err(|e| {
                tracing::warn!("could not compress value: {}", e);
                MemlinkError::Serialization(e.to_string())
            })?;
            return Ok(Payload::new(compressed, flags));
        }

        Ok(Payload::new(data, flags))
    }

    /// Decode stored bytes according to their flags
    pub fn decode(&self, data: &[u8], flags: Flags) -> Result<Value> {
        let inflated;
        let data = if flags.contains(Flags::COMPRESSED) {
            inflated = decompress_with_unknown_size(
                self.compressor.as_ref(),
                data,
                self.max_decompress_attempts,
            )
            .map_err(|e| {
                tracing::warn!("could not uncompress value: {}", e);
                MemlinkError::Deserialization(e.to_string())
            })?;
            inflated.as_slice()
        } else {
            data
        };

        if flags.contains(Flags::SERIALIZED) {
            let value = self.structured.decode(data).map_err(|e| {
                tracing::warn!("could not unserialize value: {}", e);
                e
            })?;
            return Ok(Value::Structured(value));
        }

        if flags.contains(Flags::IS_LONG) {
            Ok(Value::Int(parse_long(data)))
        } else if flags.contains(Flags::IS_DOUBLE) {
            Ok(Value::Float(parse_double(data)))
        } else {
            Ok(Value::Str(data.to_vec()))
        }
    }

    /// Decode a payload produced by `encode`
    pub fn decode_payload(&self, payload: &Payload) -> Result<Value> {
        self.decode(payload.bytes(), payload.flags())
    }
}

impl Default for PayloadCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PayloadCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadCodec")
            .field("max_decompress_attempts", &self.max_decompress_attempts)
            .finish_non_exhaustive()
    }
}

/// Leading-integer parse: optional whitespace and sign, then digits.
/// Saturates on overflow, 0 when there are no digits.
fn parse_long(data: &[u8]) -> i64 {
    let text = trim_text(data);
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        let digit = i64::from(b - b'0');
        value = match value
            .checked_mul(10)
            .and_then(|v| if negative { v.checked_sub(digit) } else { v.checked_add(digit) })
        {
            Some(v) => v,
            None if negative => return i64::MIN,
            None => return i64::MAX,
        };
    }
    value
}

/// Longest leading decimal number in the text, 0.0 when there is none
fn parse_double(data: &[u8]) -> f64 {
    let text = trim_text(data);
    if let Ok(value) = text.parse() {
        return value;
    }

    let bytes = text.as_bytes();
    let digits_end = |start: usize| {
        start + bytes[start..].iter().take_while(|b| b.is_ascii_digit()).count()
    };

    let mut end = match bytes.first() {
        Some(b'-' | b'+') => 1,
        _ => 0,
    };
    end = digits_end(end);
    if bytes.get(end) == Some(&b'.') {
        end = digits_end(end + 1);
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exponent = end + 1;
        if matches!(bytes.get(exponent), Some(b'-' | b'+')) {
            exponent += 1;
        }
        let exponent_end = digits_end(exponent);
        if exponent_end > exponent {
            end = exponent_end;
        }
    }

    text[..end].parse().unwrap_or(0.0)
}

/// Text up to the first NUL, whitespace trimmed; invalid UTF-8 yields ""
fn trim_text(data: &[u8]) -> &str {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    std::str::from_utf8(&data[..end]).unwrap_or("").trim()
}
