//! Read-only views over a loaded collection: search, filters, tag lookup
//! and the public listing.

use std::cmp::Reverse;

use gd_core::{DossierRecord, DossierStatus, DossierType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DossierFilter {
    #[default]
    All,
    Anonymous,
    Public,
    /// Everything, newest first.
    Recent,
    WithFiles,
}

impl DossierFilter {
    pub fn apply<'a>(self, records: Vec<&'a DossierRecord>) -> Vec<&'a DossierRecord> {
        match self {
            DossierFilter::All => records,
            DossierFilter::Anonymous => of_kind(records, DossierType::Anonymous),
            DossierFilter::Public => of_kind(records, DossierType::Public),
            DossierFilter::Recent => {
                let mut records = records;
                records.sort_by_key(|r| Reverse(r.timestamp));
                records
            }
            DossierFilter::WithFiles => records.into_iter().filter(|r| r.has_files()).collect(),
        }
    }
}

fn of_kind(records: Vec<&DossierRecord>, kind: DossierType) -> Vec<&DossierRecord> {
    records.into_iter().filter(|r| r.kind == kind).collect()
}

/// Case-insensitive match on title, content or any tag, then `filter`.
/// A blank search matches everything.
pub fn search<'a>(
    records: &'a [DossierRecord],
    text: &str,
    filter: DossierFilter,
) -> Vec<&'a DossierRecord> {
    let needle = text.trim().to_lowercase();
    let matched = records
        .iter()
        .filter(|r| {
            needle.is_empty()
                || contains_ci(&r.title, &needle)
                || contains_ci(&r.content, &needle)
                || r.tags.iter().any(|tag| contains_ci(tag, &needle))
        })
        .collect();
    filter.apply(matched)
}

/// Records whose title or content mention `tag`, as shown when an evidence
/// tag is clicked on the landing page.
pub fn related_to_tag<'a>(records: &'a [DossierRecord], tag: &str) -> Vec<&'a DossierRecord> {
    let needle = tag.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    records
        .iter()
        .filter(|r| contains_ci(&r.title, &needle) || contains_ci(&r.content, &needle))
        .collect()
}

/// Records shown to visitors. Rejected records stay visible unless
/// `hide_rejected` is set.
pub fn public_listing(records: &[DossierRecord], hide_rejected: bool) -> Vec<&DossierRecord> {
    records
        .iter()
        .filter(|r| !(hide_rejected && r.status == DossierStatus::Rejected))
        .collect()
}

/// Records waiting for an admin decision, in insertion order.
pub fn pending(records: &[DossierRecord]) -> Vec<&DossierRecord> {
    records.iter().filter(|r| r.status == DossierStatus::Pending).collect()
}

fn contains_ci(haystack: &str, lowercase_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowercase_needle)
}
