//! Error types for circstore
//!
//! Provides a unified error type for all store operations. Failures reported
//! by the underlying medium are wrapped in [`CircError::Medium`].

use thiserror::Error;

use crate::medium::MediumError;

/// Result type alias using CircError
pub type Result<T> = std::result::Result<T, CircError>;

/// Unified error type for circstore operations
#[derive(Debug, Error)]
pub enum CircError {
    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Store is empty")]
    StoreEmpty,

    #[error("Log index {index} out of range [{first}, {last}]")]
    IndexOutOfRange { index: u32, first: u32, last: u32 },

    #[error("Log index {0} not found")]
    RecordNotFound(u32),

    // -------------------------------------------------------------------------
    // Append Errors
    // -------------------------------------------------------------------------
    #[error("Payload too large: {len} bytes (max {max})")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("Address {address:#010x} outside store extent [{start:#010x}, {end:#010x})")]
    AddressOutOfRange { address: u32, start: u32, end: u64 },

    #[error("Log index space exhausted")]
    IndexExhausted,

    // -------------------------------------------------------------------------
    // Data Integrity Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt slot at {address:#010x}: {reason}")]
    CorruptSlot { address: u32, reason: String },

    // -------------------------------------------------------------------------
    // Medium Errors
    // -------------------------------------------------------------------------
    #[error("Medium error: {0}")]
    Medium(#[from] MediumError),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
