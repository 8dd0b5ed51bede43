//! Error types for memlink
//!
//! Provides a unified error type for all client operations.

use thiserror::Error;

use crate::protocol::ResultCode;

/// Result type alias using MemlinkError
pub type Result<T> = std::result::Result<T, MemlinkError>;

/// Unified error type for memlink operations
#[derive(Debug, Error)]
pub enum MemlinkError {
    // -------------------------------------------------------------------------
    // Payload Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // -------------------------------------------------------------------------
    // Engine Errors
    // -------------------------------------------------------------------------
    #[error("Engine error: {0}")]
    Engine(ResultCode),

    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MemlinkError {
    /// The engine status behind this error, if it came from the engine
    pub fn result_code(&self) -> Option<ResultCode> {
        match self {
            MemlinkError::Engine(code) => Some(*code),
            _ => None,
        }
    }

    /// True when the engine reported a missing key
    pub fn is_not_found(&self) -> bool {
        matches!(self, MemlinkError::Engine(ResultCode::NotFound))
    }
}
