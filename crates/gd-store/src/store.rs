//! # DossierStore
//!
//! Sole reader and writer of the `dossierData` and `blacklistedIPs` documents.
//!
//! Every mutation is a read-modify-write of the whole document, committed with
//! `compare_and_swap` against the value that was read. A writer that loses the
//! race re-reads and re-applies its change, so concurrent stores sharing one
//! backend never drop each other's records.
//!
//! Array elements that do not decode are left out of reads but written back
//! untouched, in place, by every mutation.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use gd_core::validation::{normalize_ip, require_text};
use gd_core::{
    BlobStore, DossierError, DossierRecord, DossierStatus, ExportKind, KeyValueStorage,
    NewDossier, Result, BLACKLIST_KEY, DOSSIER_KEY,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::export::{self, ExportDocument};
use crate::stats::DossierStats;

pub const DEFAULT_MAX_CAS_RETRIES: u32 = 16;

/// Handle to the persisted collections. Cheap to clone; clones share backends.
#[derive(Clone)]
pub struct DossierStore {
    kv: Arc<dyn KeyValueStorage>,
    blobs: Arc<dyn BlobStore>,
    /// Addresses treated as blacklisted without being persisted.
    seed_blacklist: Arc<Vec<String>>,
    max_cas_retries: u32,
}

impl DossierStore {
    pub fn new(kv: Arc<dyn KeyValueStorage>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            kv,
            blobs,
            seed_blacklist: Arc::new(Vec::new()),
            max_cas_retries: DEFAULT_MAX_CAS_RETRIES,
        }
    }

    pub fn with_seed_blacklist(mut self, seed: Vec<String>) -> Self {
        self.seed_blacklist = Arc::new(seed);
        self
    }

    pub fn with_max_cas_retries(mut self, retries: u32) -> Self {
        self.max_cas_retries = retries;
        self
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    // ── Records ──────────────────────────────────────────────────────────────

    /// All records in insertion order. Absent or unreadable state is empty.
    pub async fn load_all(&self) -> Result<Vec<DossierRecord>> {
        self.load_list(DOSSIER_KEY).await
    }

    pub async fn get(&self, id: u64) -> Result<Option<DossierRecord>> {
        Ok(self.load_all().await?.into_iter().find(|r| r.id == id))
    }

    /// Validates and persists a new record, returning it with its id and
    /// timestamp filled in.
    #[instrument(skip_all, fields(kind = ?new.kind, files = new.files.len()))]
    pub async fn append(&self, new: NewDossier) -> Result<DossierRecord> {
        let new = validate_new(new)?;
        let record = self
            .mutate(DOSSIER_KEY, |doc: &mut Document<DossierRecord>| {
                let now = Utc::now().trunc_subsecs(3);
                let last_id = doc
                    .items()
                    .map(|r| r.id)
                    .chain(doc.unreadable().filter_map(|raw| raw.get("id")?.as_u64()))
                    .max();
                let id = next_id(last_id, now)?;
                let record = new.clone().into_record(id, now);
                doc.push(record.clone());
                Ok((record, true))
            })
            .await?;
        info!(id = record.id, moderated = record.moderated, "dossier stored");
        Ok(record)
    }

    /// Sets the status of the record with `id`. Returns `false`, without
    /// writing anything, when no such record exists.
    #[instrument(skip(self))]
    pub async fn update_status(&self, id: u64, status: DossierStatus) -> Result<bool> {
        let updated = self
            .mutate(DOSSIER_KEY, |doc: &mut Document<DossierRecord>| {
                match doc.items_mut().find(|r| r.id == id) {
                    Some(record) => {
                        record.status = status;
                        Ok((true, true))
                    }
                    None => Ok((false, false)),
                }
            })
            .await?;
        if updated {
            info!(id, ?status, "dossier status updated");
        } else {
            debug!(id, "status update for unknown dossier ignored");
        }
        Ok(updated)
    }

    // ── Blacklist ────────────────────────────────────────────────────────────

    /// The persisted blacklist. Seed entries are not included.
    pub async fn load_blacklist(&self) -> Result<Vec<String>> {
        self.load_list(BLACKLIST_KEY).await
    }

    /// Adds `ip` unless it is malformed or already present.
    #[instrument(skip(self))]
    pub async fn add_to_blacklist(&self, ip: &str) -> Result<String> {
        let ip = normalize_ip(ip)?;
        self.mutate(BLACKLIST_KEY, |ips: &mut Document<String>| {
            if ips.items().any(|entry| *entry == ip) {
                return Err(DossierError::AlreadyBlacklisted(ip.clone()));
            }
            ips.push(ip.clone());
            Ok(((), true))
        })
        .await?;
        info!(%ip, "ip blacklisted");
        Ok(ip)
    }

    /// Removes `ip` from the persisted blacklist. Existing records keep their
    /// `moderated` flag.
    #[instrument(skip(self))]
    pub async fn remove_from_blacklist(&self, ip: &str) -> Result<bool> {
        let ip = ip.trim();
        let removed = self
            .mutate(BLACKLIST_KEY, |ips: &mut Document<String>| {
                let changed = ips.retain(|entry| entry != ip);
                Ok((changed, changed))
            })
            .await?;
        if removed {
            info!(%ip, "ip removed from blacklist");
        }
        Ok(removed)
    }

    /// True if `ip` is in the seed list or the persisted blacklist.
    pub async fn is_blacklisted(&self, ip: &str) -> Result<bool> {
        if self.seed_blacklist.iter().any(|seed| seed == ip) {
            return Ok(true);
        }
        Ok(self.load_blacklist().await?.iter().any(|entry| entry == ip))
    }

    // ── Reporting ────────────────────────────────────────────────────────────

    pub async fn stats(&self) -> Result<DossierStats> {
        let records = self.load_all().await?;
        let blacklist = self.load_blacklist().await?;
        Ok(DossierStats::collect(&records, blacklist.len()))
    }

    pub async fn export_snapshot(&self, kind: ExportKind) -> Result<ExportDocument> {
        let records = self.load_all().await?;
        let exported_at = Utc::now();
        match kind {
            ExportKind::Summary => Ok(ExportDocument::summary(&records, exported_at)),
            ExportKind::Full => {
                let blacklist = self.load_blacklist().await?;
                let records = export::inline_attachments(records, self.blobs.as_ref()).await?;
                Ok(ExportDocument::full(records, blacklist, exported_at))
            }
        }
    }

    // ── Internals ────────────────────────────────────────────────────────────

    async fn load_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        let raw = self.kv.get(key).await.map_err(DossierError::storage)?;
        Ok(Document::decode(key, raw.as_deref()).into_items())
    }

    /// Applies `change` to the decoded document under `key` and commits it
    /// with compare-and-swap. `change` returns the value to hand back and
    /// whether anything needs writing; it may run more than once.
    async fn mutate<T, R, F>(&self, key: &str, mut change: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut(&mut Document<T>) -> Result<(R, bool)>,
    {
        for attempt in 0..=self.max_cas_retries {
            let raw = self.kv.get(key).await.map_err(DossierError::storage)?;
            let mut doc: Document<T> = Document::decode(key, raw.as_deref());
            let (out, changed) = change(&mut doc)?;
            if !changed {
                return Ok(out);
            }
            let encoded = serde_json::to_string(&doc.entries)?;
            let committed = self
                .kv
                .compare_and_swap(key, raw, encoded)
                .await
                .map_err(DossierError::storage)?;
            if committed {
                return Ok(out);
            }
            debug!(key, attempt, "concurrent write detected, retrying");
        }
        warn!(key, retries = self.max_cas_retries, "giving up after repeated write conflicts");
        Err(DossierError::Conflict(format!(
            "{key} changed concurrently {} times in a row",
            self.max_cas_retries + 1
        )))
    }
}

/// One element of a persisted array.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
enum Entry<T> {
    Item(T),
    /// Kept verbatim so a write does not drop it.
    Unreadable(Value),
}

/// A persisted JSON array in stored order.
#[derive(Debug, Clone, PartialEq)]
struct Document<T> {
    entries: Vec<Entry<T>>,
}

impl<T: DeserializeOwned> Document<T> {
    /// Absent, malformed or non-array documents decode as empty.
    fn decode(key: &str, raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self { entries: Vec::new() };
        };
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "persisted document is not valid JSON, treating as empty");
                return Self { entries: Vec::new() };
            }
        };
        let Value::Array(elements) = value else {
            warn!(key, "persisted document is not an array, treating as empty");
            return Self { entries: Vec::new() };
        };
        let entries = elements
            .into_iter()
            .enumerate()
            .map(|(index, element)| match T::deserialize(&element) {
                Ok(item) => Entry::Item(item),
                Err(err) => {
                    warn!(key, index, error = %err, "skipping unreadable entry");
                    Entry::Unreadable(element)
                }
            })
            .collect();
        Self { entries }
    }
}

impl<T> Document<T> {
    fn items(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Item(item) => Some(item),
            Entry::Unreadable(_) => None,
        })
    }

    fn items_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.iter_mut().filter_map(|entry| match entry {
            Entry::Item(item) => Some(item),
            Entry::Unreadable(_) => None,
        })
    }

    fn unreadable(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Unreadable(raw) => Some(raw),
            Entry::Item(_) => None,
        })
    }

    fn into_items(self) -> Vec<T> {
        self.entries
            .into_iter()
            .filter_map(|entry| match entry {
                Entry::Item(item) => Some(item),
                Entry::Unreadable(_) => None,
            })
            .collect()
    }

    fn push(&mut self, item: T) {
        self.entries.push(Entry::Item(item));
    }

    /// Drops decoded items failing `keep`; unreadable entries always stay.
    /// Returns whether anything was removed.
    fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| match entry {
            Entry::Item(item) => keep(item),
            Entry::Unreadable(_) => true,
        });
        self.entries.len() != before
    }
}

fn validate_new(mut new: NewDossier) -> Result<NewDossier> {
    new.title = require_text("title", &new.title)?;
    new.content = require_text("content", &new.content)?;
    Ok(new)
}

/// Millisecond timestamp, moved past the largest existing id if needed.
fn next_id(last_id: Option<u64>, now: DateTime<Utc>) -> Result<u64> {
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
    match last_id {
        Some(last) if last >= millis => last.checked_add(1).ok_or_else(|| {
            DossierError::Internal(format!("no dossier id left after {last}"))
        }),
        _ => Ok(millis),
    }
}
