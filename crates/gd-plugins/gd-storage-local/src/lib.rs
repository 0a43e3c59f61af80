//! # gd-storage-local
//!
//! Filesystem backends: one JSON file per storage key, and a sharded
//! content-addressed blob directory for attachments.
//!
//! Writes go to a temporary file that is renamed over the target, so readers
//! never observe a half-written document. `compare_and_swap` is serialized
//! by an in-process lock; separate processes sharing a directory are not
//! coordinated.

pub mod blob;

pub use blob::LocalBlobStore;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{bail, Context};
use async_trait::async_trait;
use gd_core::traits::KeyValueStorage;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

pub struct FileKeyValueStorage {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileKeyValueStorage {
    /// Opens (creating if needed) the directory holding the documents.
    pub async fn open(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .with_context(|| format!("creating storage directory {}", root.display()))?;
        Ok(Self { root, write_lock: Mutex::new(()) })
    }

    fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        let valid = !key.is_empty()
            && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            bail!("invalid storage key {key:?}");
        }
        Ok(self.root.join(format!("{key}.json")))
    }

    async fn read(path: &Path) -> anyhow::Result<Option<String>> {
        match fs::read_to_string(path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("reading {}", path.display())),
        }
    }
}

#[async_trait]
impl KeyValueStorage for FileKeyValueStorage {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Self::read(&self.path_for(key)?).await
    }

    async fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.lock().await;
        write_atomically(&path, value.as_bytes()).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<String>,
        value: String,
    ) -> anyhow::Result<bool> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.lock().await;
        let current = Self::read(&path).await?;
        if current != expected {
            debug!(key, "compare_and_swap lost to a concurrent write");
            return Ok(false);
        }
        write_atomically(&path, value.as_bytes()).await?;
        Ok(true)
    }
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Writes `data` next to `target` and renames it into place.
pub(crate) async fn write_atomically(target: &Path, data: &[u8]) -> anyhow::Result<()> {
    let parent = target
        .parent()
        .with_context(|| format!("{} has no parent directory", target.display()))?;
    fs::create_dir_all(parent).await?;

    let file_name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");
    let tmp = parent.join(format!(
        ".{file_name}.{}.{}.tmp",
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    fs::write(&tmp, data)
        .await
        .with_context(|| format!("writing {}", tmp.display()))?;
    if let Err(err) = fs::rename(&tmp, target).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(err).with_context(|| format!("renaming into {}", target.display()));
    }
    Ok(())
}
