//! gromover-dossier/crates/gd-core/src/lib.rs
//!
//! The central domain types and port definitions for the dossier store.

pub mod models;
pub mod traits;
pub mod error;
pub mod notice;
pub mod validation;

// Re-exporting for easier access in other crates
pub use models::*;
pub use traits::*;
pub use error::*;
pub use notice::*;

/// Storage key holding the JSON array of dossier records.
pub const DOSSIER_KEY: &str = "dossierData";

/// Storage key holding the JSON array of blacklisted IPv4 strings.
pub const BLACKLIST_KEY: &str = "blacklistedIPs";

/// Sentinel stored as `clientIP` when the lookup fails.
pub const UNKNOWN_IP: &str = "unknown";
