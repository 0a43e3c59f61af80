//! # gromover-dossier
//!
//! Opens the configured dossier store, logs its counters and writes an
//! export snapshot into the export directory.

mod telemetry;

use std::sync::Arc;

use gd_config::Settings;
use gd_core::traits::{BlobStore, IpResolver, KeyValueStorage};
use gd_ip_lookup::HttpIpResolver;
use gd_store::{query, DossierStore};
use tracing::{debug, info, warn};

// Feature-gated imports: the backend is chosen at compile time
#[cfg(feature = "storage-local")]
use gd_storage_local::{FileKeyValueStorage, LocalBlobStore};

#[cfg(all(feature = "storage-memory", not(feature = "storage-local")))]
use gd_storage_memory::{MemoryBlobStore, MemoryStorage};

#[cfg(not(any(feature = "storage-local", feature = "storage-memory")))]
compile_error!("enable at least one of the `storage-local` or `storage-memory` features");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    telemetry::init(&settings.log)?;
    if let Some(path) = &settings.env_file {
        debug!(path = %path.display(), "loaded .env");
    }

    let (kv, blobs) = open_backends(&settings).await?;
    let store = DossierStore::new(kv, blobs)
        .with_seed_blacklist(settings.moderation.seed_blacklist.clone())
        .with_max_cas_retries(settings.storage.max_cas_retries);

    let stats = store.stats().await?;
    let records = store.load_all().await?;
    let visible = query::public_listing(&records, settings.listing.hide_rejected).len();
    info!(
        total = stats.total,
        visible,
        pending = stats.pending,
        approved = stats.approved,
        rejected = stats.rejected,
        anonymous = stats.anonymous,
        public = stats.public,
        with_files = stats.with_files,
        blacklisted_ips = stats.blacklisted_ips,
        "dossier store opened"
    );

    probe_ip_lookup(&settings, &store).await;

    let document = store.export_snapshot(settings.export.kind).await?;
    tokio::fs::create_dir_all(&settings.export.dir).await?;
    let path = settings.export.dir.join(document.file_name());
    tokio::fs::write(&path, document.to_pretty_json()?).await?;
    info!(
        path = %path.display(),
        kind = ?document.kind(),
        dossiers = document.total_dossiers(),
        "export written"
    );

    Ok(())
}

/// Checks the lookup endpoint submissions will use. Failure only warns.
async fn probe_ip_lookup(settings: &Settings, store: &DossierStore) {
    let resolver = match HttpIpResolver::new(&settings.ip_lookup.endpoint, settings.ip_lookup.timeout()) {
        Ok(resolver) => resolver,
        Err(err) => {
            warn!(error = %err, "ip lookup client unavailable");
            return;
        }
    };
    match resolver.resolve().await {
        Ok(ip) => match store.is_blacklisted(&ip).await {
            Ok(blacklisted) => info!(%ip, blacklisted, endpoint = resolver.endpoint(), "ip lookup reachable"),
            Err(err) => warn!(%ip, error = %err, "blacklist check failed"),
        },
        Err(err) => warn!(
            endpoint = resolver.endpoint(),
            error = %err,
            "ip lookup failed; submissions will record \"unknown\""
        ),
    }
}

#[cfg(feature = "storage-local")]
async fn open_backends(
    settings: &Settings,
) -> anyhow::Result<(Arc<dyn KeyValueStorage>, Arc<dyn BlobStore>)> {
    let kv = FileKeyValueStorage::open(&settings.storage.data_dir).await?;
    let blobs = LocalBlobStore::new(settings.storage.blob_dir());
    info!(data_dir = %settings.storage.data_dir.display(), "using local storage");
    Ok((Arc::new(kv), Arc::new(blobs)))
}

#[cfg(all(feature = "storage-memory", not(feature = "storage-local")))]
async fn open_backends(
    _settings: &Settings,
) -> anyhow::Result<(Arc<dyn KeyValueStorage>, Arc<dyn BlobStore>)> {
    info!("using in-memory storage; nothing will persist");
    Ok((Arc::new(MemoryStorage::new()), Arc::new(MemoryBlobStore::new())))
}
