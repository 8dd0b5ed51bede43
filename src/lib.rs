//! # memlink
//!
//! Client-side core of a memcached-style cache client:
//! - Payload codec turning typed values into flagged byte payloads
//! - Compression with output-size discovery for unknown lengths
//! - Multi-key result streams with optional CAS tokens
//! - Sticky result code tracking over engine statuses
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Client                               │
//! │        (get / set / cas / get_multi / get_delayed ...)       │
//! └───────┬───────────────────────┬─────────────────────┬───────┘
//!         │                       │                     │
//!         ▼                       ▼                     ▼
//!  ┌─────────────┐        ┌──────────────┐      ┌──────────────┐
//!  │PayloadCodec │        │ ResultStream │      │ResultTracker │
//!  │ (lz4/bincode)│       │  (CasScope)  │      │  (Outcome)   │
//!  └─────────────┘        └──────┬───────┘      └──────────────┘
//!                                │
//!                                ▼
//!                         ┌─────────────┐
//!                         │   Engine    │
//!                         │  (trait)    │
//!                         └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod protocol;
pub mod engine;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{MemlinkError, Result};
pub use config::Config;
pub use client::{Client, Registry};
pub use codec::{Flags, PayloadCodec, Value};
pub use engine::{Engine, MemoryEngine};
pub use protocol::ResultCode;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of memlink
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
