//! Local filesystem implementation of `BlobStore`.
//! Content-addressable storage with directory sharding.

use std::path::PathBuf;

use anyhow::{bail, Context};
use async_trait::async_trait;
use bytes::Bytes;
use gd_core::traits::BlobStore;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::debug;

use crate::write_atomically;

pub struct LocalBlobStore {
    /// Root directory for all attachments (e.g., "./data/blobs")
    root_path: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root_path: root }
    }

    /// Generates a sharded path: "ab/cd/abcd...hash"
    fn sharded_path(&self, hash: &str) -> PathBuf {
        let mut path = self.root_path.clone();
        path.push(&hash[0..2]);
        path.push(&hash[2..4]);
        path.push(hash);
        path
    }
}

fn is_blob_id(id: &str) -> bool {
    id.len() == 64 && id.bytes().all(|b| b.is_ascii_hexdigit())
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    /// Saves the bytes under their SHA-256 hash; existing content is not rewritten.
    async fn put(&self, data: Bytes) -> anyhow::Result<String> {
        let hash = hex::encode(Sha256::digest(&data));
        let target = self.sharded_path(&hash);

        if fs::try_exists(&target).await? {
            debug!(blob = %hash, "blob already present");
            return Ok(hash);
        }
        write_atomically(&target, &data)
            .await
            .with_context(|| format!("writing blob {hash}"))?;
        Ok(hash)
    }

    async fn get(&self, blob_id: &str) -> anyhow::Result<Option<Bytes>> {
        if !is_blob_id(blob_id) {
            bail!("malformed blob id {blob_id:?}");
        }
        match fs::read(self.sharded_path(blob_id)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("reading blob {blob_id}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_shards_by_hash_and_dedups() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().to_path_buf());

        let id = store.put(Bytes::from_static(b"evidence")).await.unwrap();
        let again = store.put(Bytes::from_static(b"evidence")).await.unwrap();
        assert_eq!(id, again);

        let expected = dir.path().join(&id[0..2]).join(&id[2..4]).join(&id);
        assert!(expected.is_file());
        assert_eq!(store.get(&id).await.unwrap().unwrap(), Bytes::from_static(b"evidence"));
    }

    #[tokio::test]
    async fn get_distinguishes_missing_from_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().to_path_buf());

        assert!(store.get(&"0".repeat(64)).await.unwrap().is_none());
        assert!(store.get("../../etc/passwd").await.is_err());
    }
}
