//! In-memory engine
//!
//! Keeps one hash map per configured server and applies memcached server
//! rules to every operation. Nothing leaves the process.
//!
//! ## Server selection
//! CRC32 of the routing key, reduced over the cumulative server weights
//! (weight 0 counts as 1).

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use bytes::Bytes;

use crate::codec::Flags;
use crate::protocol::{Behavior, DrainStep, ResultCode, ResultRecord};

use super::{Engine, Item, ServerInfo, StoreOp};

/// Longest key accepted, prefix included
pub const MAX_KEY_LENGTH: usize = 250;

/// Longest key prefix accepted
pub const MAX_PREFIX_LENGTH: usize = 128;

/// Expirations above this many seconds are absolute unix timestamps
const RELATIVE_EXPIRATION_LIMIT: u32 = 60 * 60 * 24 * 30;

#[derive(Debug, Clone)]
struct StoredItem {
    data: Bytes,
    flags: Flags,
    cas: u64,
    expires_at: Option<Instant>,
}

impl StoredItem {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map_or(false, |t| t <= now)
    }
}

/// In-process engine with memcached server semantics
#[derive(Debug, Default)]
pub struct MemoryEngine {
    /// Configured servers, in insertion order
    servers: Vec<ServerInfo>,

    /// One item map per server (same index as `servers`)
    shards: Vec<HashMap<Vec<u8>, StoredItem>>,

    /// Behavior values that differ from 0
    behaviors: HashMap<Behavior, u64>,

    /// Prefix prepended to every stored key
    prefix: Option<String>,

    /// Records buffered by the last `mget`
    pending: VecDeque<ResultRecord>,

    /// Last CAS value handed out
    last_cas: u64,

    /// Statuses to return from the next engine calls, oldest first
    injected: VecDeque<ResultCode>,

    /// Behaviors whose updates are refused, with the status to return
    rejected: HashMap<Behavior, ResultCode>,
}

impl MemoryEngine {
    /// Engine with no servers
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with a single local server
    pub fn with_local_server() -> Self {
        let mut engine = Self::new();
        engine.add_server("127.0.0.1", 11211, 0);
        engine
    }

    /// Make the next engine call fail with `code`
    ///
    /// Calls are matched in order; each injected code is used once.
    pub fn fail_next(&mut self, code: ResultCode) {
        self.injected.push_back(code);
    }

    /// Refuse every later update of `behavior` with `code`
    pub fn reject_behavior(&mut self, behavior: Behavior, code: ResultCode) {
        self.rejected.insert(behavior, code);
    }

    /// Number of live items across all servers
    pub fn item_count(&self) -> usize {
        let now = Instant::now();
        self.shards
            .iter()
            .map(|shard| shard.values().filter(|item| !item.is_expired(now)).count())
            .sum()
    }

    /// Records still waiting to be drained
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    fn take_injected(&mut self) -> Option<ResultCode> {
        self.injected.pop_front()
    }

    fn next_cas(&mut self) -> u64 {
        self.last_cas += 1;
        self.last_cas
    }

    fn shard_for(&self, routing_key: &[u8]) -> Result<usize, ResultCode> {
        if self.servers.is_empty() {
            return Err(ResultCode::NoServers);
        }

        let total: u64 = self.servers.iter().map(|s| u64::from(s.weight.max(1))).sum();
        let mut point = u64::from(crc32fast::hash(routing_key)) % total;
        for (index, server) in self.servers.iter().enumerate() {
            let weight = u64::from(server.weight.max(1));
            if point < weight {
                return Ok(index);
            }
            point -= weight;
        }
        Ok(self.servers.len() - 1)
    }

    fn full_key(&self, key: &[u8]) -> Result<Vec<u8>, ResultCode> {
        let prefix = self.prefix.as_deref().unwrap_or("").as_bytes();
        if key.is_empty()
            || prefix.len() + key.len() > MAX_KEY_LENGTH
            || key.iter().any(|b| b.is_ascii_whitespace() || b.is_ascii_control())
        {
            return Err(ResultCode::BadKeyProvided);
        }

        let mut full = Vec::with_capacity(prefix.len() + key.len());
        full.extend_from_slice(prefix);
        full.extend_from_slice(key);
        Ok(full)
    }

    /// Live item lookup; expired items are dropped on the way
    fn live_item(&mut self, shard: usize, full_key: &[u8]) -> Option<&mut StoredItem> {
        let now = Instant::now();
        let map = &mut self.shards[shard];
        if map.get(full_key).map_or(false, |item| item.is_expired(now)) {
            map.remove(full_key);
            return None;
        }
        map.get_mut(full_key)
    }

    fn expiry(expiration: u32) -> Option<Instant> {
        let now = Instant::now();
        match expiration {
            0 => None,
            secs if secs <= RELATIVE_EXPIRATION_LIMIT => {
                Some(now + Duration::from_secs(u64::from(secs)))
            }
            timestamp => {
                let unix_now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                let remaining = u64::from(timestamp).saturating_sub(unix_now);
                Some(now + Duration::from_secs(remaining))
            }
        }
    }

    fn routed(&self, routing_key: &[u8], key: &[u8]) -> Result<(usize, Vec<u8>), ResultCode> {
        let full_key = self.full_key(key)?;
        let shard = self.shard_for(routing_key)?;
        Ok((shard, full_key))
    }

    fn adjust(&mut self, key: &[u8], apply: impl FnOnce(u64) -> u64) -> Result<u64, ResultCode> {
        if let Some(code) = self.take_injected() {
            return Err(code);
        }

        let (shard, full_key) = self.routed(key, key)?;
        let cas = self.next_cas();
        let item = self.live_item(shard, &full_key).ok_or(ResultCode::NotFound)?;

        let current: u64 = std::str::from_utf8(&item.data)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .ok_or(ResultCode::ClientError)?;
        let updated = apply(current);

        item.data = Bytes::from(updated.to_string());
        item.cas = cas;
        Ok(updated)
    }
}

impl Engine for MemoryEngine {
    fn mget(&mut self, server_key: Option<&[u8]>, keys: &[&[u8]]) -> ResultCode {
        self.pending.clear();
        if let Some(code) = self.take_injected() {
            return code;
        }

        let with_cas = self.behavior(Behavior::SupportCas) != 0;
        let mut per_shard: Vec<Vec<ResultRecord>> = vec![Vec::new(); self.shards.len()];

        for &key in keys {
            let (shard, full_key) = match self.routed(server_key.unwrap_or(key), key) {
                Ok(routed) => routed,
                Err(code) => return code,
            };
            if let Some(item) = self.live_item(shard, &full_key) {
                per_shard[shard].push(ResultRecord {
                    key: key.to_vec(),
                    data: item.data.clone(),
                    flags: item.flags,
                    cas: if with_cas { item.cas } else { 0 },
                });
            }
        }

        self.pending = per_shard.into_iter().flatten().collect();
        tracing::trace!("mget: {} keys, {} buffered", keys.len(), self.pending.len());
        ResultCode::Success
    }

    fn fetch_result(&mut self) -> DrainStep {
        if let Some(code) = self.take_injected() {
            return DrainStep::Failed(code);
        }

        match self.pending.pop_front() {
            Some(record) => DrainStep::Record(record),
            None => DrainStep::End,
        }
    }

    fn get(&mut self, server_key: Option<&[u8]>, key: &[u8]) -> Result<Item, ResultCode> {
        if let Some(code) = self.take_injected() {
            return Err(code);
        }

        let (shard, full_key) = self.routed(server_key.unwrap_or(key), key)?;
        self.live_item(shard, &full_key)
            .map(|item| Item {
                data: item.data.clone(),
                flags: item.flags,
            })
            .ok_or(ResultCode::NotFound)
    }

    fn store(
        &mut self,
        op: StoreOp,
        server_key: &[u8],
        key: &[u8],
        data: &[u8],
        expiration: u32,
        flags: Flags,
    ) -> ResultCode {
        if let Some(code) = self.take_injected() {
            return code;
        }

        let (shard, full_key) = match self.routed(server_key, key) {
            Ok(routed) => routed,
            Err(code) => return code,
        };
        let cas = self.next_cas();
        let exists = self.live_item(shard, &full_key).is_some();

        match op {
            StoreOp::Add if exists => return ResultCode::NotStored,
            StoreOp::Replace | StoreOp::Append | StoreOp::Prepend if !exists => {
                return ResultCode::NotStored
            }
            StoreOp::Append | StoreOp::Prepend => {
                if let Some(item) = self.shards[shard].get_mut(&full_key) {
                    let mut joined = Vec::with_capacity(item.data.len() + data.len());
                    if op == StoreOp::Append {
                        joined.extend_from_slice(&item.data);
                        joined.extend_from_slice(data);
                    } else {
                        joined.extend_from_slice(data);
                        joined.extend_from_slice(&item.data);
                    }
                    item.data = Bytes::from(joined);
                    item.cas = cas;
                }
                return ResultCode::Stored;
            }
            _ => {}
        }

        self.shards[shard].insert(
            full_key,
            StoredItem {
                data: Bytes::copy_from_slice(data),
                flags,
                cas,
                expires_at: Self::expiry(expiration),
            },
        );
        tracing::trace!("{}: stored {} bytes (cas {})", op.name(), data.len(), cas);
        ResultCode::Stored
    }

    fn cas(
        &mut self,
        server_key: &[u8],
        key: &[u8],
        data: &[u8],
        expiration: u32,
        flags: Flags,
        cas: u64,
    ) -> ResultCode {
        if let Some(code) = self.take_injected() {
            return code;
        }

        let (shard, full_key) = match self.routed(server_key, key) {
            Ok(routed) => routed,
            Err(code) => return code,
        };
        let next = self.next_cas();

        match self.live_item(shard, &full_key) {
            None => ResultCode::NotFound,
            Some(item) if item.cas != cas => ResultCode::DataExists,
            Some(item) => {
                *item = StoredItem {
                    data: Bytes::copy_from_slice(data),
                    flags,
                    cas: next,
                    expires_at: Self::expiry(expiration),
                };
                ResultCode::Stored
            }
        }
    }

    fn delete(&mut self, server_key: &[u8], key: &[u8], _hold: u32) -> ResultCode {
        if let Some(code) = self.take_injected() {
            return code;
        }

        let (shard, full_key) = match self.routed(server_key, key) {
            Ok(routed) => routed,
            Err(code) => return code,
        };
        if self.live_item(shard, &full_key).is_none() {
            return ResultCode::NotFound;
        }
        self.shards[shard].remove(&full_key);
        ResultCode::Deleted
    }

    fn increment(&mut self, key: &[u8], offset: u32) -> Result<u64, ResultCode> {
        self.adjust(key, |current| current.wrapping_add(u64::from(offset)))
    }

    fn decrement(&mut self, key: &[u8], offset: u32) -> Result<u64, ResultCode> {
        self.adjust(key, |current| current.saturating_sub(u64::from(offset)))
    }

    fn flush(&mut self, delay: u32) -> ResultCode {
        if let Some(code) = self.take_injected() {
            return code;
        }
        if self.servers.is_empty() {
            return ResultCode::NoServers;
        }

        if delay == 0 {
            self.shards.iter_mut().for_each(HashMap::clear);
        } else {
            let deadline = Instant::now() + Duration::from_secs(u64::from(delay));
            for item in self.shards.iter_mut().flat_map(|shard| shard.values_mut()) {
                item.expires_at = Some(item.expires_at.map_or(deadline, |t| t.min(deadline)));
            }
        }
        ResultCode::Success
    }

    fn behavior(&self, behavior: Behavior) -> u64 {
        self.behaviors.get(&behavior).copied().unwrap_or(0)
    }

    fn set_behavior(&mut self, behavior: Behavior, value: u64) -> ResultCode {
        if let Some(&code) = self.rejected.get(&behavior) {
            return code;
        }
        if value == 0 {
            self.behaviors.remove(&behavior);
        } else {
            self.behaviors.insert(behavior, value);
        }
        ResultCode::Success
    }

    fn prefix_key(&self) -> Option<String> {
        self.prefix.clone()
    }

    fn set_prefix_key(&mut self, prefix: Option<&str>) -> ResultCode {
        match prefix {
            None | Some("") => self.prefix = None,
            Some(p)
                if p.len() > MAX_PREFIX_LENGTH
                    || p.bytes().any(|b| b.is_ascii_whitespace() || b.is_ascii_control()) =>
            {
                return ResultCode::BadKeyProvided;
            }
            Some(p) => self.prefix = Some(p.to_string()),
        }
        ResultCode::Success
    }

    fn add_server(&mut self, host: &str, port: u16, weight: u32) -> ResultCode {
        if host.is_empty() {
            return ResultCode::HostLookupFailure;
        }

        self.servers.push(ServerInfo {
            host: host.to_string(),
            port,
            weight,
        });
        self.shards.push(HashMap::new());
        ResultCode::Success
    }

    fn servers(&self) -> Vec<ServerInfo> {
        self.servers.clone()
    }

    fn server_by_key(&self, server_key: &[u8]) -> Result<ServerInfo, ResultCode> {
        let shard = self.shard_for(server_key)?;
        Ok(self.servers[shard].clone())
    }
}
