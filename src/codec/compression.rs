//! Compression adapter
//!
//! Compressed payloads do not carry their inflated size, so inflation
//! guesses: the first output buffer is twice the input, and every
//! "buffer too small" doubles it until the attempt bound is reached.
//!
//! ```text
//! attempt:   1      2      3     ...   n
//! buffer:   2·len  4·len  8·len  ...  2^n·len
//! ```

use thiserror::Error;

/// Compression failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompressionError {
    #[error("output buffer too small")]
    BufferTooSmall,

    #[error("payload still did not fit after {attempts} buffer doublings")]
    AttemptsExhausted { attempts: u32 },

    #[error("corrupt compressed data: {0}")]
    Corrupt(String),

    #[error("compression failed: {0}")]
    Failed(String),
}

/// Byte-level compressor used for `COMPRESSED` payloads
pub trait Compressor: Send + Sync {
    /// Compress a whole buffer
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, CompressionError>;

    /// Inflate into `output`, returning the inflated length.
    ///
    /// Must report `BufferTooSmall` (and nothing else) when `output` cannot
    /// hold the result.
    fn decompress_into(&self, input: &[u8], output: &mut [u8]) -> Result<usize, CompressionError>;
}

/// LZ4 block compression
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Compressor;

impl Compressor for Lz4Compressor {
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, CompressionError> {
        Ok(lz4_flex::block::compress(input))
    }

    fn decompress_into(&self, input: &[u8], output: &mut [u8]) -> Result<usize, CompressionError> {
        match lz4_flex::block::decompress_into(input, output) {
            Ok(len) => Ok(len),
            Err(lz4_flex::block::DecompressError::OutputTooSmall { .. }) => {
                Err(CompressionError::BufferTooSmall)
            }
            Err(e) => Err(CompressionError::Corrupt(e.to_string())),
        }
    }
}

/// Inflate a payload whose original size is unknown
///
/// Tries at most `max_attempts` buffer sizes. Any error other than
/// `BufferTooSmall` stops the search immediately.
pub fn decompress_with_unknown_size(
    compressor: &dyn Compressor,
    input: &[u8],
    max_attempts: u32,
) -> Result<Vec<u8>, CompressionError> {
    let base = input.len().max(1);
    let mut output = Vec::new();

    for attempt in 1..=max_attempts {
        let size = base
            .checked_mul(1usize << attempt.min(usize::BITS - 1))
            .ok_or(CompressionError::AttemptsExhausted { attempts: attempt - 1 })?;

        output.clear();
        output.resize(size, 0);

        match compressor.decompress_into(input, &mut output) {
            Ok(len) => {
                output.truncate(len);
                output.shrink_to_fit();
                return Ok(output);
            }
            Err(CompressionError::BufferTooSmall) => {
                tracing::trace!("decompress: {} bytes too small, doubling", size);
            }
            Err(e) => return Err(e),
        }
    }

    Err(CompressionError::AttemptsExhausted {
        attempts: max_attempts,
    })
}
