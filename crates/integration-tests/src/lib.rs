//! Shared fixtures for the cross-crate scenarios under `tests/`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gd_core::{DossierType, IpResolver, KeyValueStorage, MockIpResolver, NewDossier};
use gd_storage_local::{FileKeyValueStorage, LocalBlobStore};
use gd_storage_memory::{MemoryBlobStore, MemoryStorage};
use gd_store::{DossierStore, SubmissionForm, SubmissionService};

pub fn memory_store() -> DossierStore {
    DossierStore::new(Arc::new(MemoryStorage::new()), Arc::new(MemoryBlobStore::new()))
}

pub async fn local_store(dir: &Path) -> DossierStore {
    let kv = FileKeyValueStorage::open(dir).await.expect("open local storage");
    let blobs = LocalBlobStore::new(dir.join("blobs"));
    DossierStore::new(Arc::new(kv), Arc::new(blobs))
}

/// Resolver that always reports `ip`.
pub fn fixed_resolver(ip: &'static str) -> Arc<dyn IpResolver> {
    let mut resolver = MockIpResolver::new();
    resolver.expect_resolve().returning(move || Ok(ip.to_string()));
    Arc::new(resolver)
}

/// Resolver whose lookup never completes.
pub struct StalledResolver;

#[async_trait]
impl IpResolver for StalledResolver {
    async fn resolve(&self) -> anyhow::Result<String> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok("10.0.0.1".to_string())
    }
}

pub fn submission_service(store: DossierStore, ip: &'static str) -> SubmissionService {
    SubmissionService::new(store, fixed_resolver(ip))
}

pub fn new_dossier(title: &str) -> NewDossier {
    NewDossier {
        title: title.to_string(),
        content: format!("content of {title}"),
        tags: vec![],
        kind: DossierType::Public,
        client_ip: "1.2.3.4".to_string(),
        moderated: false,
        files: vec![],
    }
}

pub fn form(title: &str, content: &str, kind: DossierType) -> SubmissionForm {
    SubmissionForm {
        title: title.to_string(),
        content: content.to_string(),
        tags: String::new(),
        kind,
        attachments: vec![],
    }
}

/// Wraps a backend and yields to the scheduler after every read, so that
/// tasks on one thread interleave between reading a document and writing it back.
pub struct YieldingStorage<S> {
    pub inner: S,
}

#[async_trait]
impl<S: KeyValueStorage> KeyValueStorage for YieldingStorage<S> {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let value = self.inner.get(key).await;
        tokio::task::yield_now().await;
        value
    }

    async fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
        self.inner.set(key, value).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<String>,
        value: String,
    ) -> anyhow::Result<bool> {
        self.inner.compare_and_swap(key, expected, value).await
    }
}
