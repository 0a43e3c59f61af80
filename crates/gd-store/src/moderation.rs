//! # Moderation Flow
//!
//! Admin actions. Each one is an entry point: failures are logged and turned
//! into a `Notice` instead of being returned.

use gd_core::{DossierRecord, DossierStatus, ExportKind, Notice, Result};
use tracing::warn;

use crate::export::ExportDocument;
use crate::query;
use crate::stats::DossierStats;
use crate::store::DossierStore;

#[derive(Clone)]
pub struct ModerationService {
    store: DossierStore,
}

impl ModerationService {
    pub fn new(store: DossierStore) -> Self {
        Self { store }
    }

    /// Records still awaiting a decision, in insertion order.
    pub async fn pending(&self) -> Result<Vec<DossierRecord>> {
        let records = self.store.load_all().await?;
        Ok(query::pending(&records).into_iter().cloned().collect())
    }

    pub async fn approve(&self, id: u64) -> Notice {
        self.decide(id, DossierStatus::Approved).await
    }

    pub async fn reject(&self, id: u64) -> Notice {
        self.decide(id, DossierStatus::Rejected).await
    }

    async fn decide(&self, id: u64, status: DossierStatus) -> Notice {
        match self.store.update_status(id, status).await {
            Ok(true) if status == DossierStatus::Approved => Notice::success("Досье одобрено"),
            Ok(true) => Notice::error("Досье отклонено"),
            Ok(false) => Notice::warning(format!("Досье {id} не найдено")),
            Err(err) => {
                warn!(id, error = %err, "moderation decision failed");
                Notice::from(&err)
            }
        }
    }

    pub async fn blacklist(&self) -> Result<Vec<String>> {
        self.store.load_blacklist().await
    }

    pub async fn blacklist_add(&self, ip: &str) -> Notice {
        match self.store.add_to_blacklist(ip).await {
            Ok(ip) => Notice::success(format!("IP {ip} добавлен в черный список")),
            Err(err) => {
                warn!(ip, error = %err, "blacklist add refused");
                Notice::from(&err)
            }
        }
    }

    pub async fn blacklist_remove(&self, ip: &str) -> Notice {
        match self.store.remove_from_blacklist(ip).await {
            Ok(true) => Notice::success(format!("IP {} удален из черного списка", ip.trim())),
            Ok(false) => Notice::info(format!("IP {} нет в черном списке", ip.trim())),
            Err(err) => {
                warn!(ip, error = %err, "blacklist remove failed");
                Notice::from(&err)
            }
        }
    }

    pub async fn stats(&self) -> Result<DossierStats> {
        self.store.stats().await
    }

    /// Full backup: records with attachment contents plus the blacklist.
    pub async fn export(&self) -> Result<ExportDocument> {
        self.store.export_snapshot(ExportKind::Full).await
    }
}
