//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the store.

use async_trait::async_trait;
use bytes::Bytes;

/// Durable key-value storage holding whole JSON documents as strings.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    /// Returns the raw document under `key`, or `None` if it was never written.
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Unconditionally replaces the document under `key`.
    async fn set(&self, key: &str, value: String) -> anyhow::Result<()>;

    /// Replaces the document only if it still equals `expected`
    /// (`None` meaning absent). Returns `false` when another writer got there first.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<String>,
        value: String,
    ) -> anyhow::Result<bool>;
}

/// Content-addressed storage for attachment bytes.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Saves the bytes and returns their SHA-256 hex digest.
    /// Saving identical content twice is a no-op returning the same id.
    async fn put(&self, data: Bytes) -> anyhow::Result<String>;

    async fn get(&self, blob_id: &str) -> anyhow::Result<Option<Bytes>>;
}

/// Resolves the public IP the submission is coming from.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait IpResolver: Send + Sync {
    async fn resolve(&self) -> anyhow::Result<String>;
}
