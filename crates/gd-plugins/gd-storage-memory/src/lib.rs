//! # gd-storage-memory
//!
//! In-process implementations of `KeyValueStorage` and `BlobStore`.
//! Nothing survives a restart; meant for tests and throwaway previews.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use gd_core::traits::{BlobStore, KeyValueStorage};
use sha2::{Digest, Sha256};

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStorage for MemoryStorage {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    /// The entry guard holds the shard lock, so compare and write are atomic.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<String>,
        value: String,
    ) -> anyhow::Result<bool> {
        match (self.entries.entry(key.to_string()), expected) {
            (Entry::Occupied(mut slot), Some(expected)) if *slot.get() == expected => {
                slot.insert(value);
                Ok(true)
            }
            (Entry::Vacant(slot), None) => {
                slot.insert(value);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<String, Bytes>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, data: Bytes) -> anyhow::Result<String> {
        let hash = hex::encode(Sha256::digest(&data));
        self.blobs.entry(hash.clone()).or_insert(data);
        Ok(hash)
    }

    async fn get(&self, blob_id: &str) -> anyhow::Result<Option<Bytes>> {
        Ok(self.blobs.get(blob_id).map(|b| b.value().clone()))
    }
}
