//! Engine Module
//!
//! The capability interface the client drives. An engine owns connections,
//! server selection and the wire protocol; the client only sees statuses
//! and encoded records.
//!
//! ## Responsibilities of an engine
//! - Accept multi-key requests and buffer their results for draining
//! - Execute single-key reads and the store family
//! - Keep behavior options and the key prefix
//! - Maintain the server list
//!
//! `MemoryEngine` is an in-process implementation with memcached server
//! semantics, used by tests, benchmarks and the CLI demo.

mod memory;

pub use memory::{MemoryEngine, MAX_KEY_LENGTH, MAX_PREFIX_LENGTH};

use bytes::Bytes;

use crate::codec::Flags;
use crate::protocol::{Behavior, DrainStep, ResultCode};

/// Store-family operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    /// Store unconditionally
    Set,
    /// Store only if the key is absent
    Add,
    /// Store only if the key is present
    Replace,
    /// Append to an existing value
    Append,
    /// Prepend to an existing value
    Prepend,
}

impl StoreOp {
    pub fn name(self) -> &'static str {
        match self {
            StoreOp::Set => "set",
            StoreOp::Add => "add",
            StoreOp::Replace => "replace",
            StoreOp::Append => "append",
            StoreOp::Prepend => "prepend",
        }
    }
}

/// A server known to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub host: String,
    pub port: u16,
    pub weight: u32,
}

/// Value returned by a direct single-key read
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub data: Bytes,
    pub flags: Flags,
}

/// Cache engine capabilities
///
/// Every method is a blocking call. Statuses follow `ResultCode`; methods
/// returning `Result` use the error side for non-nominal statuses only.
pub trait Engine {
    // -------------------------------------------------------------------------
    // Retrieval
    // -------------------------------------------------------------------------

    /// Submit a multi-key request, replacing any results still buffered.
    /// With a routing key every key goes to the server owning that key.
    fn mget(&mut self, server_key: Option<&[u8]>, keys: &[&[u8]]) -> ResultCode;

    /// Drain the next buffered record
    fn fetch_result(&mut self) -> DrainStep;

    /// Direct single-key read
    fn get(&mut self, server_key: Option<&[u8]>, key: &[u8]) -> Result<Item, ResultCode>;

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    fn store(
        &mut self,
        op: StoreOp,
        server_key: &[u8],
        key: &[u8],
        data: &[u8],
        expiration: u32,
        flags: Flags,
    ) -> ResultCode;

    fn cas(
        &mut self,
        server_key: &[u8],
        key: &[u8],
        data: &[u8],
        expiration: u32,
        flags: Flags,
        cas: u64,
    ) -> ResultCode;

    fn delete(&mut self, server_key: &[u8], key: &[u8], hold: u32) -> ResultCode;

    fn increment(&mut self, key: &[u8], offset: u32) -> Result<u64, ResultCode>;

    fn decrement(&mut self, key: &[u8], offset: u32) -> Result<u64, ResultCode>;

    /// Invalidate all items, immediately or after `delay` seconds
    fn flush(&mut self, delay: u32) -> ResultCode;

    // -------------------------------------------------------------------------
    // Options
    // -------------------------------------------------------------------------

    fn behavior(&self, behavior: Behavior) -> u64;

    fn set_behavior(&mut self, behavior: Behavior, value: u64) -> ResultCode;

    fn prefix_key(&self) -> Option<String>;

    /// `None` clears the prefix
    fn set_prefix_key(&mut self, prefix: Option<&str>) -> ResultCode;

    // -------------------------------------------------------------------------
    // Servers
    // -------------------------------------------------------------------------

    fn add_server(&mut self, host: &str, port: u16, weight: u32) -> ResultCode;

    fn servers(&self) -> Vec<ServerInfo>;

    fn server_by_key(&self, server_key: &[u8]) -> Result<ServerInfo, ResultCode>;
}
