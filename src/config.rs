//! Configuration for memlink
//!
//! Centralized client configuration with sensible defaults.

use crate::error::{MemlinkError, Result};

/// Address of one cache server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddr {
    pub host: String,
    pub port: u16,
    pub weight: u32,
}

impl ServerAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            weight: 0,
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }
}

/// Main configuration for a client instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Payload Configuration
    // -------------------------------------------------------------------------
    /// Compress string payloads on store
    pub compression: bool,

    /// Number of buffer doublings tried when inflating a compressed payload.
    /// Payloads needing more than `2^attempts` times their compressed size
    /// fail to decode.
    pub max_decompress_attempts: u32,

    /// Upper bound (bytes) for encoded structured values
    pub max_structured_size: u64,

    // -------------------------------------------------------------------------
    // Engine Configuration
    // -------------------------------------------------------------------------
    /// Prefix the engine prepends to every key
    pub prefix_key: Option<String>,

    /// Servers added when the client is built
    pub servers: Vec<ServerAddr>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compression: true,
            max_decompress_attempts: 16,
            max_structured_size: 64 * 1024 * 1024, // 64 MB
            prefix_key: None,
            servers: Vec::new(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the client cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.max_decompress_attempts == 0 {
            return Err(MemlinkError::Config(
                "max_decompress_attempts must be at least 1".to_string(),
            ));
        }
        if self.max_decompress_attempts >= usize::BITS {
            return Err(MemlinkError::Config(format!(
                "max_decompress_attempts must be below {}",
                usize::BITS
            )));
        }
        if self.max_structured_size == 0 {
            return Err(MemlinkError::Config(
                "max_structured_size must be non-zero".to_string(),
            ));
        }
        if let Some(server) = self.servers.iter().find(|s| s.host.is_empty()) {
            return Err(MemlinkError::Config(format!(
                "server with port {} has an empty host",
                server.port
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Turn compression of string payloads on or off
    pub fn compression(mut self, enabled: bool) -> Self {
        self.config.compression = enabled;
        self
    }

    /// Set the doubling bound for decompression
    pub fn max_decompress_attempts(mut self, attempts: u32) -> Self {
        self.config.max_decompress_attempts = attempts;
        self
    }

    /// Set the size limit for structured values (in bytes)
    pub fn max_structured_size(mut self, size: u64) -> Self {
        self.config.max_structured_size = size;
        self
    }

    /// Set the key prefix
    pub fn prefix_key(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefix_key = Some(prefix.into());
        self
    }

    /// Add a server
    pub fn server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.servers.push(ServerAddr::new(host, port));
        self
    }

    /// Add a weighted server
    pub fn weighted_server(mut self, host: impl Into<String>, port: u16, weight: u32) -> Self {
        self.config
            .servers
            .push(ServerAddr::new(host, port).with_weight(weight));
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
