//! Structured value codec
//!
//! Values that are neither strings nor scalars are handed to a
//! `StructuredCodec`. The default is bincode with a size limit.

use bincode::Options;

use crate::error::{MemlinkError, Result};

use super::Structured;

/// Encoder/decoder for `SERIALIZED` payloads
pub trait StructuredCodec: Send + Sync {
    /// Fails with `MemlinkError::Serialization`
    fn encode(&self, value: &Structured) -> Result<Vec<u8>>;

    /// Fails with `MemlinkError::Deserialization`
    fn decode(&self, bytes: &[u8]) -> Result<Structured>;
}

/// bincode-backed codec
#[derive(Debug, Clone, Copy)]
pub struct BincodeCodec {
    limit: u64,
}

impl BincodeCodec {
    /// Codec refusing encodings larger than `limit` bytes
    pub fn with_limit(limit: u64) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    fn options(&self) -> impl Options {
        bincode::DefaultOptions::new().with_limit(self.limit)
    }
}

impl Default for BincodeCodec {
    fn default() -> Self {
        Self::with_limit(64 * 1024 * 1024)
    }
}

impl StructuredCodec for BincodeCodec {
    fn encode(&self, value: &Structured) -> Result<Vec<u8>> {
        self.options()
            .serialize(value)
            .map_err(|e| MemlinkError::Serialization(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Structured> {
        self.options()
            .deserialize(bytes)
            .map_err(|e| MemlinkError::Deserialization(e.to_string()))
    }
}
