//! Persistent client registry
//!
//! Clients created under a persistent id are kept here and handed back to
//! every later caller asking for the same id, so connection setup and
//! options survive between uses.
//!
//! ## Concurrency Model
//!
//! - The id → client map sits behind one `Mutex`, held only for lookups
//!   and inserts. It is never held while a client lock is taken or while
//!   a new client is initialized.
//! - Each client sits behind its own `Mutex`; callers lock it for the
//!   duration of their operation
//! - Two callers racing to create the same id may both run `init`; the
//!   first insert wins and the other client is dropped

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::Client;
use crate::engine::Engine;
use crate::error::Result;

const IDENTITY_PREFIX: &str = "memcached:id=";

/// A client shared through the registry
pub type SharedClient<E> = Arc<Mutex<Client<E>>>;

/// Process-wide map of persistent clients
pub struct Registry<E: Engine> {
    entries: Mutex<HashMap<String, SharedClient<E>>>,
}

impl<E: Engine> Registry<E> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Registry key for a persistent id
    pub fn identity(id: &str) -> String {
        format!("{}{}", IDENTITY_PREFIX, id)
    }

    /// The client registered under `id`, creating it with `init` if absent
    ///
    /// `init` runs only when no client exists yet; the second element of
    /// the result tells whether it ran.
    pub fn get_or_create<F>(&self, id: &str, init: F) -> Result<(SharedClient<E>, bool)>
    where
        F: FnOnce() -> Result<Client<E>>,
    {
        let identity = Self::identity(id);

        if let Some(existing) = self.entries.lock().get(&identity).cloned() {
            tracing::debug!("reusing persistent client {}", identity);
            return Ok((existing, false));
        }

        let mut client = init()?;
        client.set_persistent_id(id.to_string());

        match self.entries.lock().entry(identity) {
            Entry::Occupied(slot) => {
                tracing::debug!("persistent client {} registered concurrently", slot.key());
                Ok((Arc::clone(slot.get()), false))
            }
            Entry::Vacant(slot) => {
                tracing::debug!("registered persistent client {}", slot.key());
                let shared = Arc::new(Mutex::new(client));
                slot.insert(Arc::clone(&shared));
                Ok((shared, true))
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<SharedClient<E>> {
        self.entries.lock().get(&Self::identity(id)).cloned()
    }

    /// Forget the client under `id`; holders keep their handle
    pub fn remove(&self, id: &str) -> Option<SharedClient<E>> {
        self.entries.lock().remove(&Self::identity(id))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Persistent ids currently registered, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .entries
            .lock()
            .keys()
            .filter_map(|identity| identity.strip_prefix(IDENTITY_PREFIX).map(str::to_string))
            .collect();
        ids.sort();
        ids
    }

    /// Drop every registered client, returning how many there were
    pub fn shutdown(&self) -> usize {
        let drained: Vec<_> = self.entries.lock().drain().collect();
        tracing::debug!("registry shutdown: releasing {} clients", drained.len());
        drained.len()
    }
}

impl<E: Engine> Default for Registry<E> {
    fn default() -> Self {
        Self::new()
    }
}
