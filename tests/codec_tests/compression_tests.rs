//! Tests for unknown-size decompression
//!
//! These tests verify:
//! - Buffer sizes double from twice the compressed length
//! - The search stops at the attempt bound
//! - Non-size errors stop the search immediately
//! - Highly compressible data is recovered with the LZ4 compressor

use std::sync::Mutex;

use memlink::codec::{
    decompress_with_unknown_size, CompressionError, Compressor, Flags, Lz4Compressor, PayloadCodec,
    Value,
};
use memlink::MemlinkError;

// =============================================================================
// Helper Types
// =============================================================================

/// Passes input through; decompression fills `original_len` bytes
/// and records every buffer size it was offered.
struct SizedFake {
    original_len: usize,
    offered: Mutex<Vec<usize>>,
}

impl SizedFake {
    fn new(original_len: usize) -> Self {
        Self {
            original_len,
            offered: Mutex::new(Vec::new()),
        }
    }

    fn offered(&self) -> Vec<usize> {
        self.offered.lock().unwrap().clone()
    }
}

impl Compressor for SizedFake {
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, CompressionError> {
        Ok(input.to_vec())
    }

    fn decompress_into(&self, _input: &[u8], output: &mut [u8]) -> Result<usize, CompressionError> {
        self.offered.lock().unwrap().push(output.len());
        if output.len() < self.original_len {
            return Err(CompressionError::BufferTooSmall);
        }
        output[..self.original_len].fill(b'z');
        Ok(self.original_len)
    }
}

/// Fails with corruption on the first call
struct CorruptFake {
    calls: Mutex<u32>,
}

impl Compressor for CorruptFake {
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, CompressionError> {
        Ok(input.to_vec())
    }

    fn decompress_into(&self, _input: &[u8], _output: &mut [u8]) -> Result<usize, CompressionError> {
        *self.calls.lock().unwrap() += 1;
        Err(CompressionError::Corrupt("bad header".to_string()))
    }
}

// =============================================================================
// Doubling Search Tests
// =============================================================================

#[test]
fn test_sizes_double_from_twice_input() {
    let fake = SizedFake::new(70);
    let out = decompress_with_unknown_size(&fake, &[0u8; 10], 16).unwrap();

    assert_eq!(out.len(), 70);
    assert_eq!(fake.offered(), vec![20, 40, 80]);
}

#[test]
fn test_first_attempt_success() {
    let fake = SizedFake::new(5);
    let out = decompress_with_unknown_size(&fake, &[0u8; 10], 16).unwrap();

    assert_eq!(out, vec![b'z'; 5]);
    assert_eq!(fake.offered(), vec![20]);
}

#[test]
fn test_empty_input_uses_unit_base() {
    let fake = SizedFake::new(3);
    let out = decompress_with_unknown_size(&fake, &[], 16).unwrap();

    assert_eq!(out.len(), 3);
    assert_eq!(fake.offered(), vec![2, 4]);
}

#[test]
fn test_attempt_bound_is_respected() {
    let fake = SizedFake::new(1_000_000);
    let err = decompress_with_unknown_size(&fake, &[0u8; 10], 4).unwrap_err();

    assert_eq!(err, CompressionError::AttemptsExhausted { attempts: 4 });
    assert_eq!(fake.offered(), vec![20, 40, 80, 160]);
}

#[test]
fn test_non_size_error_stops_search() {
    let fake = CorruptFake {
        calls: Mutex::new(0),
    };
    let err = decompress_with_unknown_size(&fake, b"data", 16).unwrap_err();

    assert!(matches!(err, CompressionError::Corrupt(_)));
    assert_eq!(*fake.calls.lock().unwrap(), 1);
}

// =============================================================================
// LZ4 Tests
// =============================================================================

#[test]
fn test_lz4_highly_compressible() {
    let original = vec![b'a'; 100_000];
    let compressed = Lz4Compressor.compress(&original).unwrap();
    assert!(compressed.len() * 2 < original.len());

    let out = decompress_with_unknown_size(&Lz4Compressor, &compressed, 16).unwrap();
    assert_eq!(out, original);
}

#[test]
fn test_lz4_incompressible() {
    let original: Vec<u8> = (0..4096u32).map(|i| (i.wrapping_mul(2_654_435_761) >> 24) as u8).collect();
    let compressed = Lz4Compressor.compress(&original).unwrap();

    let out = decompress_with_unknown_size(&Lz4Compressor, &compressed, 16).unwrap();
    assert_eq!(out, original);
}

#[test]
fn test_codec_attempt_bound_surfaces_as_decode_error() {
    let original = vec![b'a'; 100_000];
    let compressed = Lz4Compressor.compress(&original).unwrap();
    let codec = PayloadCodec::new().with_max_decompress_attempts(2);

    let result = codec.decode(&compressed, Flags::COMPRESSED);
    assert!(matches!(result, Err(MemlinkError::Deserialization(_))));

    let generous = PayloadCodec::new().with_max_decompress_attempts(16);
    assert_eq!(
        generous.decode(&compressed, Flags::COMPRESSED).unwrap(),
        Value::Str(original)
    );
}
