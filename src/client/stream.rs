//! Result stream
//!
//! Drives the engine's "submit keys, then drain records" pattern.
//!
//! ## States
//! ```text
//!   Idle ──submit──► Submitted ──next──► Draining ──END──► Done
//!     │                  │                   │
//!     └──────────────────┴───────────────────┴──► Failed
//! ```
//! A stream resumed after a delayed get starts in `Submitted`.
//!
//! Decode failures are fatal for the whole stream. Collecting helpers
//! return the error without a partial result, and the records still
//! buffered in the engine are discarded.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use crate::codec::{PayloadCodec, Value};
use crate::engine::Engine;
use crate::error::{MemlinkError, Result};
use crate::protocol::{Behavior, DrainStep, FetchedItem, ResultCode, ResultTracker};

/// Position of a stream in the drain sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Submitted,
    Draining,
    Done,
    Failed,
}

/// Decoded multi-get results, keyed by the record's own key
pub type MultiGet = (HashMap<String, Value>, HashMap<String, u64>);

/// One drain sequence over an engine
pub struct ResultStream<'a, E: Engine> {
    engine: &'a mut E,
    codec: &'a PayloadCodec,
    tracker: &'a mut ResultTracker,
    state: StreamState,
}

impl<'a, E: Engine> ResultStream<'a, E> {
    /// Fresh stream, nothing submitted yet
    pub fn new(engine: &'a mut E, codec: &'a PayloadCodec, tracker: &'a mut ResultTracker) -> Self {
        Self {
            engine,
            codec,
            tracker,
            state: StreamState::Idle,
        }
    }

    /// Stream over results submitted earlier (delayed get)
    pub fn resume(engine: &'a mut E, codec: &'a PayloadCodec, tracker: &'a mut ResultTracker) -> Self {
        Self {
            state: StreamState::Submitted,
            ..Self::new(engine, codec, tracker)
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Submit the keys of this stream
    pub fn submit(&mut self, server_key: Option<&[u8]>, keys: &[&[u8]]) -> Result<()> {
        if self.state != StreamState::Idle {
            return Err(MemlinkError::InvalidArgument(format!(
                "cannot submit in state {:?}",
                self.state
            )));
        }

        tracing::debug!("submitting {} keys", keys.len());
        let status = self.engine.mget(server_key, keys);
        if let Err(e) = self.tracker.check(status) {
            self.state = StreamState::Failed;
            return Err(e);
        }

        self.state = StreamState::Submitted;
        Ok(())
    }

    /// Drain and decode the next record; `None` once the engine signals the end
    pub fn next_item(&mut self) -> Result<Option<FetchedItem>> {
        match self.state {
            StreamState::Idle => {
                return Err(MemlinkError::InvalidArgument(
                    "nothing submitted to drain".to_string(),
                ))
            }
            StreamState::Failed => {
                return Err(MemlinkError::InvalidArgument(
                    "stream already failed".to_string(),
                ))
            }
            StreamState::Done => return Ok(None),
            StreamState::Submitted | StreamState::Draining => {}
        }

        self.state = StreamState::Draining;
        match self.engine.fetch_result() {
            DrainStep::Record(record) => match self.codec.decode(&record.data, record.flags) {
                Ok(value) => {
                    let key = String::from_utf8_lossy(&record.key).into_owned();
                    tracing::trace!("drained {} ({}, cas {})", key, value.kind(), record.cas);
                    Ok(Some(FetchedItem {
                        key,
                        value,
                        cas: record.cas,
                    }))
                }
                Err(e) => {
                    self.state = StreamState::Failed;
                    self.tracker.record(ResultCode::PayloadFailure);
                    Err(e)
                }
            },
            DrainStep::End => self.finish(ResultCode::End),
            DrainStep::Failed(code) => self.finish(code),
        }
    }

    /// Drain everything into maps keyed by record key
    ///
    /// The CAS map stays empty unless `with_cas` is set.
    pub fn collect_map(mut self, with_cas: bool) -> Result<MultiGet> {
        let mut values = HashMap::new();
        let mut tokens = HashMap::new();

        self.collect_with(|item| {
            if with_cas {
                tokens.insert(item.key.clone(), item.cas);
            }
            values.insert(item.key, item.value);
        })?;

        Ok((values, tokens))
    }

    /// Drain everything in arrival order
    pub fn collect_all(mut self) -> Result<Vec<FetchedItem>> {
        let mut items = Vec::new();
        self.collect_with(|item| items.push(item))?;
        Ok(items)
    }

    /// Feed every record to `sink` until the end
    ///
    /// On failure the records still buffered in the engine are thrown
    /// away, so a later `fetch` cannot hand out part of the result.
    fn collect_with<F>(&mut self, mut sink: F) -> Result<()>
    where
        F: FnMut(FetchedItem),
    {
        loop {
            match self.next_item() {
                Ok(Some(item)) => sink(item),
                Ok(None) => return Ok(()),
                Err(e) => {
                    if self.state == StreamState::Failed {
                        self.discard_rest();
                    }
                    return Err(e);
                }
            }
        }
    }

    fn discard_rest(&mut self) {
        let mut dropped = 0usize;
        while let DrainStep::Record(_) = self.engine.fetch_result() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::debug!("discarded {} records after a failed drain", dropped);
        }
    }

    fn finish(&mut self, code: ResultCode) -> Result<Option<FetchedItem>> {
        match self.tracker.check(code) {
            Ok(_) => {
                self.state = StreamState::Done;
                Ok(None)
            }
            Err(e) => {
                self.state = StreamState::Failed;
                Err(e)
            }
        }
    }
}

/// Turns CAS support on for its lifetime, then puts the old value back
///
/// Restoring happens in `Drop`, so early returns and errors are covered.
/// The status of turning CAS on is kept for the caller to check.
pub struct CasScope<'a, E: Engine> {
    engine: &'a mut E,
    saved: Option<u64>,
    status: ResultCode,
}

impl<'a, E: Engine> CasScope<'a, E> {
    /// Enable CAS support when `enable` is set; otherwise a pass-through
    pub fn new(engine: &'a mut E, enable: bool) -> Self {
        let (saved, status) = if enable {
            let previous = engine.behavior(Behavior::SupportCas);
            let status = engine.set_behavior(Behavior::SupportCas, 1);
            (Some(previous), status)
        } else {
            (None, ResultCode::Success)
        };

        Self {
            engine,
            saved,
            status,
        }
    }

    /// Engine status from enabling CAS support, `Success` for a pass-through
    pub fn status(&self) -> ResultCode {
        self.status
    }
}

impl<E: Engine> Deref for CasScope<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        &*self.engine
    }
}

impl<E: Engine> DerefMut for CasScope<'_, E> {
    fn deref_mut(&mut self) -> &mut E {
        &mut *self.engine
    }
}

impl<E: Engine> Drop for CasScope<'_, E> {
    fn drop(&mut self) {
        if let Some(previous) = self.saved {
            let status = self.engine.set_behavior(Behavior::SupportCas, previous);
            if status != ResultCode::Success {
                tracing::warn!("could not restore CAS support to {}: {}", previous, status);
            }
        }
    }
}
