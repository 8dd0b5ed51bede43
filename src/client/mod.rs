//! Client Module
//!
//! The public face of the library: value-level operations on top of an
//! engine, with payload encoding, result draining and the sticky result
//! code handled here.
//!
//! ## Concurrency Model: single owner
//!
//! Every operation takes `&mut self` and blocks until the engine answers.
//! A client shared between threads goes through `Registry`, which hands out
//! `Arc<Mutex<Client>>`.
//!
//! ## Retrieval paths
//! - `get`:             direct engine read, no stream
//! - `get_with_cas`:    one-key stream inside a CAS scope
//! - `get_multi*`:      submit + drain into a map
//! - `get_delayed*`:    submit only; `fetch`/`fetch_all` drain later

mod keys;
mod registry;
mod stream;

pub use keys::AsKey;
pub use registry::{Registry, SharedClient};
pub use stream::{CasScope, MultiGet, ResultStream, StreamState};

use std::collections::HashMap;

use crate::codec::{Payload, PayloadCodec, Value};
use crate::config::Config;
use crate::engine::{Engine, MemoryEngine, ServerInfo, StoreOp};
use crate::error::{MemlinkError, Result};
use crate::protocol::{
    ClientOption, FetchedItem, OptionValue, Outcome, ResultCode, ResultTracker,
};

/// Cache client over an engine
pub struct Client<E: Engine = MemoryEngine> {
    /// The engine every operation goes through
    engine: E,

    /// Value ⇄ payload transformer
    codec: PayloadCodec,

    /// Compress string payloads on store
    compression: bool,

    /// Sticky last result code
    tracker: ResultTracker,

    /// Registry identity, when the client is shared
    persistent_id: Option<String>,
}

impl Client<MemoryEngine> {
    /// Client over an in-process engine
    pub fn in_memory(config: Config) -> Result<Self> {
        Self::new(MemoryEngine::new(), config)
    }
}

impl<E: Engine> Client<E> {
    /// Build a client over `engine`
    ///
    /// Applies the configured prefix key and adds the configured servers.
    pub fn new(mut engine: E, config: Config) -> Result<Self> {
        config.validate()?;

        if let Some(prefix) = config.prefix_key.as_deref() {
            let status = engine.set_prefix_key(Some(prefix));
            if Outcome::of(status).is_failure() {
                return Err(MemlinkError::Config(format!(
                    "prefix key rejected: {}",
                    status
                )));
            }
        }

        for server in &config.servers {
            let status = engine.add_server(&server.host, server.port, server.weight);
            if Outcome::of(status).is_failure() {
                return Err(MemlinkError::Config(format!(
                    "could not add server {}:{}: {}",
                    server.host, server.port, status
                )));
            }
        }

        tracing::debug!(
            "client ready: {} servers, compression={}",
            config.servers.len(),
            config.compression
        );

        Ok(Self {
            engine,
            codec: PayloadCodec::from_config(&config),
            compression: config.compression,
            tracker: ResultTracker::new(),
            persistent_id: None,
        })
    }

    /// Replace the payload codec (compressor, structured codec)
    pub fn with_codec(mut self, codec: PayloadCodec) -> Self {
        self.codec = codec;
        self
    }

    // =========================================================================
    // Single-key retrieval
    // =========================================================================

    /// Fetch one value
    pub fn get(&mut self, key: impl AsRef<[u8]>) -> Result<Value> {
        self.get_direct(None, key.as_ref())
    }

    /// Fetch one value, routed by `server_key`
    pub fn get_by_key(&mut self, server_key: impl AsRef<[u8]>, key: impl AsRef<[u8]>) -> Result<Value> {
        self.get_direct(Some(server_key.as_ref()), key.as_ref())
    }

    /// Fetch one value together with its CAS token
    pub fn get_with_cas(&mut self, key: impl AsRef<[u8]>) -> Result<(Value, u64)> {
        self.get_tracked(None, key.as_ref())
    }

    /// Fetch one value and its CAS token, routed by `server_key`
    pub fn get_by_key_with_cas(
        &mut self,
        server_key: impl AsRef<[u8]>,
        key: impl AsRef<[u8]>,
    ) -> Result<(Value, u64)> {
        self.get_tracked(Some(server_key.as_ref()), key.as_ref())
    }

    fn get_direct(&mut self, server_key: Option<&[u8]>, key: &[u8]) -> Result<Value> {
        self.tracker.reset();

        let item = match self.engine.get(server_key, key) {
            Ok(item) => item,
            Err(code) => return self.failed(code),
        };

        self.decode(&item.data, item.flags)
    }

    fn get_tracked(&mut self, server_key: Option<&[u8]>, key: &[u8]) -> Result<(Value, u64)> {
        self.tracker.reset();

        let mut scope = CasScope::new(&mut self.engine, true);
        self.tracker.check(scope.status())?;
        let next = {
            let mut stream = ResultStream::new(&mut *scope, &self.codec, &mut self.tracker);
            stream.submit(server_key, &[key])?;
            stream.next_item()?
        };
        drop(scope);

        match next {
            Some(item) => Ok((item.value, item.cas)),
            None => self.failed(ResultCode::NotFound),
        }
    }

    // =========================================================================
    // Multi-key retrieval
    // =========================================================================

    /// Fetch many values; missing keys are simply absent from the map
    pub fn get_multi<I>(&mut self, keys: I) -> Result<HashMap<String, Value>>
    where
        I: IntoIterator,
        I::Item: AsKey,
    {
        self.get_multi_impl(None, keys, false).map(|(values, _)| values)
    }

    /// `get_multi` with every key routed by `server_key`
    pub fn get_multi_by_key<I>(&mut self, server_key: impl AsRef<[u8]>, keys: I) -> Result<HashMap<String, Value>>
    where
        I: IntoIterator,
        I::Item: AsKey,
    {
        self.get_multi_impl(Some(server_key.as_ref()), keys, false)
            .map(|(values, _)| values)
    }

    /// Fetch many values plus one CAS token per returned key
    pub fn get_multi_with_cas<I>(&mut self, keys: I) -> Result<MultiGet>
    where
        I: IntoIterator,
        I::Item: AsKey,
    {
        self.get_multi_impl(None, keys, true)
    }

    /// `get_multi_with_cas` with every key routed by `server_key`
    pub fn get_multi_by_key_with_cas<I>(&mut self, server_key: impl AsRef<[u8]>, keys: I) -> Result<MultiGet>
    where
        I: IntoIterator,
        I::Item: AsKey,
    {
        self.get_multi_impl(Some(server_key.as_ref()), keys, true)
    }

    fn get_multi_impl<I>(&mut self, server_key: Option<&[u8]>, keys: I, with_cas: bool) -> Result<MultiGet>
    where
        I: IntoIterator,
        I::Item: AsKey,
    {
        self.tracker.reset();

        let keys: Vec<I::Item> = keys.into_iter().collect();
        self.submit(server_key, &keys, with_cas)?;

        ResultStream::resume(&mut self.engine, &self.codec, &mut self.tracker).collect_map(with_cas)
    }

    // =========================================================================
    // Delayed retrieval
    // =========================================================================

    /// Submit keys now, drain later with `fetch`/`fetch_all`
    pub fn get_delayed<I>(&mut self, keys: I, with_cas: bool) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsKey,
    {
        self.tracker.reset();
        let keys: Vec<I::Item> = keys.into_iter().collect();
        self.submit(None, &keys, with_cas)
    }

    /// `get_delayed` with every key routed by `server_key`
    pub fn get_delayed_by_key<I>(&mut self, server_key: impl AsRef<[u8]>, keys: I, with_cas: bool) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsKey,
    {
        self.tracker.reset();
        let keys: Vec<I::Item> = keys.into_iter().collect();
        self.submit(Some(server_key.as_ref()), &keys, with_cas)
    }

    /// Next buffered result, `None` when nothing is left
    pub fn fetch(&mut self) -> Result<Option<FetchedItem>> {
        ResultStream::resume(&mut self.engine, &self.codec, &mut self.tracker).next_item()
    }

    /// All remaining buffered results, in arrival order
    pub fn fetch_all(&mut self) -> Result<Vec<FetchedItem>> {
        ResultStream::resume(&mut self.engine, &self.codec, &mut self.tracker).collect_all()
    }

    /// Submit the key entries of `keys` with CAS support scoped to the submission
    fn submit<K: AsKey>(&mut self, server_key: Option<&[u8]>, keys: &[K], with_cas: bool) -> Result<()> {
        let key_refs: Vec<&[u8]> = keys.iter().filter_map(|k| k.as_key()).collect();
        if key_refs.len() < keys.len() {
            tracing::debug!("skipping {} non-string keys", keys.len() - key_refs.len());
        }

        let mut scope = CasScope::new(&mut self.engine, with_cas);
        self.tracker.check(scope.status())?;
        let mut stream = ResultStream::new(&mut *scope, &self.codec, &mut self.tracker);
        stream.submit(server_key, &key_refs)
    }

    // =========================================================================
    // Storage
    // =========================================================================

    /// Store a value unconditionally
    pub fn set(&mut self, key: impl AsRef<[u8]>, value: impl Into<Value>, expiration: u32) -> Result<()> {
        self.store(StoreOp::Set, None, key.as_ref(), &value.into(), expiration)
    }

    pub fn set_by_key(
        &mut self,
        server_key: impl AsRef<[u8]>,
        key: impl AsRef<[u8]>,
        value: impl Into<Value>,
        expiration: u32,
    ) -> Result<()> {
        self.store(StoreOp::Set, Some(server_key.as_ref()), key.as_ref(), &value.into(), expiration)
    }

    /// Store a value only if the key does not exist
    pub fn add(&mut self, key: impl AsRef<[u8]>, value: impl Into<Value>, expiration: u32) -> Result<()> {
        self.store(StoreOp::Add, None, key.as_ref(), &value.into(), expiration)
    }

    pub fn add_by_key(
        &mut self,
        server_key: impl AsRef<[u8]>,
        key: impl AsRef<[u8]>,
        value: impl Into<Value>,
        expiration: u32,
    ) -> Result<()> {
        self.store(StoreOp::Add, Some(server_key.as_ref()), key.as_ref(), &value.into(), expiration)
    }

    /// Store a value only if the key already exists
    pub fn replace(&mut self, key: impl AsRef<[u8]>, value: impl Into<Value>, expiration: u32) -> Result<()> {
        self.store(StoreOp::Replace, None, key.as_ref(), &value.into(), expiration)
    }

    pub fn replace_by_key(
        &mut self,
        server_key: impl AsRef<[u8]>,
        key: impl AsRef<[u8]>,
        value: impl Into<Value>,
        expiration: u32,
    ) -> Result<()> {
        self.store(StoreOp::Replace, Some(server_key.as_ref()), key.as_ref(), &value.into(), expiration)
    }

    /// Append to an existing value (compression must be off)
    pub fn append(&mut self, key: impl AsRef<[u8]>, value: impl Into<Value>) -> Result<()> {
        self.store(StoreOp::Append, None, key.as_ref(), &value.into(), 0)
    }

    pub fn append_by_key(
        &mut self,
        server_key: impl AsRef<[u8]>,
        key: impl AsRef<[u8]>,
        value: impl Into<Value>,
    ) -> Result<()> {
        self.store(StoreOp::Append, Some(server_key.as_ref()), key.as_ref(), &value.into(), 0)
    }

    /// Prepend to an existing value (compression must be off)
    pub fn prepend(&mut self, key: impl AsRef<[u8]>, value: impl Into<Value>) -> Result<()> {
        self.store(StoreOp::Prepend, None, key.as_ref(), &value.into(), 0)
    }

    pub fn prepend_by_key(
        &mut self,
        server_key: impl AsRef<[u8]>,
        key: impl AsRef<[u8]>,
        value: impl Into<Value>,
    ) -> Result<()> {
        self.store(StoreOp::Prepend, Some(server_key.as_ref()), key.as_ref(), &value.into(), 0)
    }

    /// Store several values, stopping at the first failure
    pub fn set_multi<I, K, V>(&mut self, entries: I, expiration: u32) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: Into<Value>,
    {
        for (key, value) in entries {
            self.store(StoreOp::Set, None, key.as_ref(), &value.into(), expiration)?;
        }
        Ok(())
    }

    /// `set_multi` with every entry routed by `server_key`
    pub fn set_multi_by_key<I, K, V>(&mut self, server_key: impl AsRef<[u8]>, entries: I, expiration: u32) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: Into<Value>,
    {
        let server_key = server_key.as_ref();
        for (key, value) in entries {
            self.store(StoreOp::Set, Some(server_key), key.as_ref(), &value.into(), expiration)?;
        }
        Ok(())
    }

    /// Store only if the item still carries `cas_token`
    ///
    /// Fails with `Engine(DataExists)` when someone else wrote in between.
    pub fn cas(&mut self, cas_token: u64, key: impl AsRef<[u8]>, value: impl Into<Value>, expiration: u32) -> Result<()> {
        let key = key.as_ref();
        self.cas_impl(cas_token, key, key, &value.into(), expiration)
    }

    pub fn cas_by_key(
        &mut self,
        cas_token: u64,
        server_key: impl AsRef<[u8]>,
        key: impl AsRef<[u8]>,
        value: impl Into<Value>,
        expiration: u32,
    ) -> Result<()> {
        self.cas_impl(cas_token, server_key.as_ref(), key.as_ref(), &value.into(), expiration)
    }

    fn store(
        &mut self,
        op: StoreOp,
        server_key: Option<&[u8]>,
        key: &[u8],
        value: &Value,
        expiration: u32,
    ) -> Result<()> {
        if self.compression && matches!(op, StoreOp::Append | StoreOp::Prepend) {
            tracing::warn!("cannot {} with compression turned on", op.name());
            return Err(MemlinkError::InvalidArgument(format!(
                "cannot {} with compression turned on",
                op.name()
            )));
        }

        let payload = self.encode(value)?;
        let status = self.engine.store(
            op,
            server_key.unwrap_or(key),
            key,
            payload.bytes(),
            expiration,
            payload.flags(),
        );
        self.status(status)
    }

    fn cas_impl(
        &mut self,
        cas_token: u64,
        server_key: &[u8],
        key: &[u8],
        value: &Value,
        expiration: u32,
    ) -> Result<()> {
        let payload = self.encode(value)?;
        let status = self.engine.cas(
            server_key,
            key,
            payload.bytes(),
            expiration,
            payload.flags(),
            cas_token,
        );
        self.status(status)
    }

    // =========================================================================
    // Deletion and counters
    // =========================================================================

    /// Remove a key; `hold` is passed through to the engine
    pub fn delete(&mut self, key: impl AsRef<[u8]>, hold: u32) -> Result<()> {
        let key = key.as_ref();
        let status = self.engine.delete(key, key, hold);
        self.status(status)
    }

    pub fn delete_by_key(&mut self, server_key: impl AsRef<[u8]>, key: impl AsRef<[u8]>, hold: u32) -> Result<()> {
        let status = self.engine.delete(server_key.as_ref(), key.as_ref(), hold);
        self.status(status)
    }

    /// Add `offset` to a numeric value, returning the new value
    pub fn increment(&mut self, key: impl AsRef<[u8]>, offset: i64) -> Result<u64> {
        let offset = Self::counter_offset(offset)?;
        match self.engine.increment(key.as_ref(), offset) {
            Ok(value) => Ok(value),
            Err(code) => self.failed(code),
        }
    }

    /// Subtract `offset` from a numeric value (floored at 0), returning the new value
    pub fn decrement(&mut self, key: impl AsRef<[u8]>, offset: i64) -> Result<u64> {
        let offset = Self::counter_offset(offset)?;
        match self.engine.decrement(key.as_ref(), offset) {
            Ok(value) => Ok(value),
            Err(code) => self.failed(code),
        }
    }

    fn counter_offset(offset: i64) -> Result<u32> {
        if offset < 0 {
            tracing::warn!("offset has to be > 0");
            return Err(MemlinkError::InvalidArgument(
                "offset has to be > 0".to_string(),
            ));
        }
        u32::try_from(offset).map_err(|_| {
            MemlinkError::InvalidArgument(format!("offset {} exceeds {}", offset, u32::MAX))
        })
    }

    // =========================================================================
    // Servers
    // =========================================================================

    pub fn add_server(&mut self, host: &str, port: u16, weight: u32) -> Result<()> {
        let status = self.engine.add_server(host, port, weight);
        self.status(status)
    }

    pub fn server_list(&self) -> Vec<ServerInfo> {
        self.engine.servers()
    }

    /// The server owning `server_key`
    pub fn server_by_key(&mut self, server_key: impl AsRef<[u8]>) -> Result<ServerInfo> {
        match self.engine.server_by_key(server_key.as_ref()) {
            Ok(server) => Ok(server),
            Err(code) => self.failed(code),
        }
    }

    /// Invalidate every item, now or after `delay` seconds
    pub fn flush(&mut self, delay: u32) -> Result<()> {
        let status = self.engine.flush(delay);
        self.status(status)
    }

    // =========================================================================
    // Options
    // =========================================================================

    pub fn get_option(&self, option: ClientOption) -> Result<OptionValue> {
        match option {
            ClientOption::Compression => Ok(OptionValue::Bool(self.compression)),
            ClientOption::PrefixKey => Ok(OptionValue::Str(
                self.engine.prefix_key().unwrap_or_default(),
            )),
            ClientOption::Behavior(behavior) => {
                if behavior.needs_servers() && self.engine.servers().is_empty() {
                    tracing::warn!("no servers defined");
                    return Err(MemlinkError::InvalidArgument(
                        "no servers defined".to_string(),
                    ));
                }
                Ok(OptionValue::Int(self.engine.behavior(behavior)))
            }
        }
    }

    pub fn set_option(&mut self, option: ClientOption, value: impl Into<OptionValue>) -> Result<()> {
        let value = value.into();
        tracing::debug!("set option {:?} = {:?}", option, value);

        match option {
            ClientOption::Compression => {
                self.compression = value.as_bool();
                Ok(())
            }
            ClientOption::PrefixKey => {
                let prefix = match value {
                    OptionValue::Str(s) => s,
                    OptionValue::Int(n) => n.to_string(),
                    OptionValue::Bool(true) => "1".to_string(),
                    OptionValue::Bool(false) => String::new(),
                };
                let status = self.engine.set_prefix_key(Some(prefix.as_str()));
                self.status(status).map_err(|_| {
                    tracing::warn!("bad key provided");
                    MemlinkError::InvalidArgument("bad key provided".to_string())
                })
            }
            ClientOption::Behavior(behavior) => {
                let raw = value.as_int().ok_or_else(|| {
                    MemlinkError::InvalidArgument(format!("{:?} expects an integer", behavior))
                })?;
                let status = self.engine.set_behavior(behavior, raw);
                self.status(status).map_err(|_| {
                    tracing::warn!("error setting option {:?}", behavior);
                    MemlinkError::InvalidArgument(format!("error setting option {:?}", behavior))
                })
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Last non-nominal result code seen by this client
    pub fn result_code(&self) -> ResultCode {
        self.tracker.last()
    }

    pub fn compression(&self) -> bool {
        self.compression
    }

    pub fn codec(&self) -> &PayloadCodec {
        &self.codec
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Direct engine access, bypassing the codec and the result tracking
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Registry identity when the client is shared
    pub fn persistent_id(&self) -> Option<&str> {
        self.persistent_id.as_deref()
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent_id.is_some()
    }

    pub(crate) fn set_persistent_id(&mut self, id: String) {
        self.persistent_id = Some(id);
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    fn encode(&mut self, value: &Value) -> Result<Payload> {
        let tracker = &mut self.tracker;
        self.codec.encode(value, self.compression).map_err(|e| {
            tracker.record(ResultCode::PayloadFailure);
            e
        })
    }

    fn decode(&mut self, data: &[u8], flags: crate::codec::Flags) -> Result<Value> {
        let tracker = &mut self.tracker;
        self.codec.decode(data, flags).map_err(|e| {
            tracker.record(ResultCode::PayloadFailure);
            e
        })
    }

    fn status(&mut self, code: ResultCode) -> Result<()> {
        self.tracker.check(code).map(|_| ())
    }

    /// Record `code` and fail with it
    fn failed<T>(&mut self, code: ResultCode) -> Result<T> {
        self.tracker.record(code);
        Err(MemlinkError::Engine(code))
    }
}
