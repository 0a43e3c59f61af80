//! # DossierError
//!
//! Centralized error handling for the dossier store.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all store operations.
#[derive(Error, Debug)]
pub enum DossierError {
    /// Required field missing or empty after trimming
    #[error("validation error: {0}")]
    Validation(String),

    /// Not a dotted-decimal IPv4 address
    #[error("invalid IPv4 address: {0}")]
    InvalidIp(String),

    /// Blacklist already holds this address
    #[error("IP {0} is already blacklisted")]
    AlreadyBlacklisted(String),

    /// An attachment could not be read; nothing was persisted
    #[error("failed to read attachment {name}: {reason}")]
    AttachmentRead { name: String, reason: String },

    /// Backend failure (e.g., disk full, permission denied)
    #[error("storage error: {0}")]
    Storage(String),

    /// A document could not be encoded as JSON
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Compare-and-swap kept losing to concurrent writers
    #[error("conflict: {0}")]
    Conflict(String),

    /// An invariant the store relies on no longer holds (e.g., ids exhausted)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl DossierError {
    /// Wraps a backend error coming through a port.
    pub fn storage(err: anyhow::Error) -> Self {
        Self::Storage(format!("{err:#}"))
    }
}

/// A specialized Result type for dossier logic.
pub type Result<T> = std::result::Result<T, DossierError>;
