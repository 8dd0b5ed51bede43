//! Codec Module
//!
//! Turns application values into stored bytes plus type flags, and back.
//!
//! ## Flags
//! ```text
//! bit 0  COMPRESSED   bytes are compressed, inflate before anything else
//! bit 1  SERIALIZED   bytes are a structured-value encoding
//! bit 2  IS_LONG      bytes are the decimal text of an integer
//! bit 3  IS_DOUBLE    bytes are the decimal text of a float
//! ```
//! No content bit set means a raw string.
//!
//! ## Encode pipeline
//! ```text
//! Value ──► text / structured bytes ──► [compress if COMPRESSED] ──► Payload
//! ```

mod value;
mod payload;
mod compression;
mod structured;

pub use value::{Structured, Value};
pub use payload::{Payload, PayloadCodec};
pub use compression::{decompress_with_unknown_size, CompressionError, Compressor, Lz4Compressor};
pub use structured::{BincodeCodec, StructuredCodec};

bitflags::bitflags! {
    /// Type flags stored next to every value
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u32 {
        const COMPRESSED = 1 << 0;
        const SERIALIZED = 1 << 1;
        const IS_LONG = 1 << 2;
        const IS_DOUBLE = 1 << 3;
    }
}

impl Flags {
    /// Content flags: at most one of these is set by the encoder
    pub const CONTENT: Flags = Flags::SERIALIZED.union(Flags::IS_LONG).union(Flags::IS_DOUBLE);

    /// Wrap raw flags read from a server, keeping bits we do not know
    pub fn from_wire(bits: u32) -> Self {
        Flags::from_bits_retain(bits)
    }
}
