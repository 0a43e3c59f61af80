//! Counters shown on the public dossier page and the admin panel.

use gd_core::{DossierRecord, DossierStatus, DossierType};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DossierStats {
    pub total: usize,
    pub anonymous: usize,
    pub public: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub with_files: usize,
    pub moderated: usize,
    pub blacklisted_ips: usize,
}

impl DossierStats {
    pub fn collect(records: &[DossierRecord], blacklisted_ips: usize) -> Self {
        let mut stats = DossierStats { total: records.len(), blacklisted_ips, ..Default::default() };
        for record in records {
            match record.kind {
                DossierType::Anonymous => stats.anonymous += 1,
                DossierType::Public => stats.public += 1,
            }
            match record.status {
                DossierStatus::Pending => stats.pending += 1,
                DossierStatus::Approved => stats.approved += 1,
                DossierStatus::Rejected => stats.rejected += 1,
            }
            if record.has_files() {
                stats.with_files += 1;
            }
            if record.moderated {
                stats.moderated += 1;
            }
        }
        stats
    }
}
