//! Result records
//!
//! What the engine hands back while a multi-key request is drained, and
//! what the client hands back to callers after decoding.

use bytes::Bytes;

use crate::codec::{Flags, Value};

use super::ResultCode;

/// One server response to one key, still encoded
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    /// Storage key, without any engine prefix
    pub key: Vec<u8>,

    /// Encoded value bytes
    pub data: Bytes,

    /// Type flags stored with the value
    pub flags: Flags,

    /// CAS token; 0 when CAS support was off at submission
    pub cas: u64,
}

/// One step of a drain
#[derive(Debug, Clone, PartialEq)]
pub enum DrainStep {
    /// A record is available
    Record(ResultRecord),

    /// No more buffered records
    End,

    /// The engine failed while producing the next record
    Failed(ResultCode),
}

/// A decoded record, as returned by `fetch`/`fetch_all`
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedItem {
    pub key: String,
    pub value: Value,
    pub cas: u64,
}
