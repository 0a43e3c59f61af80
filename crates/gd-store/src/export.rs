//! # Export
//!
//! Downloadable JSON snapshots of the store. The summary form is what the
//! public dossier page offers; the full form is the admin backup and carries
//! attachment contents as data-URLs together with the blacklist.

use chrono::{DateTime, Utc};
use gd_core::{
    AttachmentPayload, BlobStore, DossierError, DossierRecord, DossierStatus, DossierType,
    ExportKind, Result,
};
use serde::Serialize;
use tracing::warn;

use crate::data_url;

/// A record with its attachments reduced to a count.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DossierSummary {
    pub id: u64,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: DossierType,
    pub tags: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub status: DossierStatus,
    pub files_count: usize,
}

impl From<&DossierRecord> for DossierSummary {
    fn from(record: &DossierRecord) -> Self {
        Self {
            id: record.id,
            title: record.title.clone(),
            content: record.content.clone(),
            kind: record.kind,
            tags: record.tags.clone(),
            timestamp: record.timestamp,
            status: record.status,
            files_count: record.files.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryExport {
    pub export_date: DateTime<Utc>,
    pub total_dossiers: usize,
    pub dossiers: Vec<DossierSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullExport {
    pub dossiers: Vec<DossierRecord>,
    #[serde(rename = "blacklistedIPs")]
    pub blacklisted_ips: Vec<String>,
    pub export_date: DateTime<Utc>,
    pub total_dossiers: usize,
    pub pending_moderation: usize,
    /// Files whose blob was gone at export time. They keep their `blob`
    /// reference instead of a `data` URL.
    pub missing_attachments: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ExportDocument {
    Summary(SummaryExport),
    Full(FullExport),
}

impl ExportDocument {
    pub fn summary(records: &[DossierRecord], exported_at: DateTime<Utc>) -> Self {
        ExportDocument::Summary(SummaryExport {
            export_date: exported_at,
            total_dossiers: records.len(),
            dossiers: records.iter().map(DossierSummary::from).collect(),
        })
    }

    pub fn full(
        records: Vec<DossierRecord>,
        blacklisted_ips: Vec<String>,
        exported_at: DateTime<Utc>,
    ) -> Self {
        let pending_moderation = records
            .iter()
            .filter(|r| r.status == DossierStatus::Pending)
            .count();
        let missing_attachments = records
            .iter()
            .flat_map(|r| &r.files)
            .filter(|f| matches!(f.payload, AttachmentPayload::Blob { .. }))
            .count();
        ExportDocument::Full(FullExport {
            total_dossiers: records.len(),
            dossiers: records,
            blacklisted_ips,
            export_date: exported_at,
            pending_moderation,
            missing_attachments,
        })
    }

    pub fn kind(&self) -> ExportKind {
        match self {
            ExportDocument::Summary(_) => ExportKind::Summary,
            ExportDocument::Full(_) => ExportKind::Full,
        }
    }

    pub fn total_dossiers(&self) -> usize {
        match self {
            ExportDocument::Summary(doc) => doc.total_dossiers,
            ExportDocument::Full(doc) => doc.total_dossiers,
        }
    }

    pub fn exported_at(&self) -> DateTime<Utc> {
        match self {
            ExportDocument::Summary(doc) => doc.export_date,
            ExportDocument::Full(doc) => doc.export_date,
        }
    }

    /// Download name, e.g. `gromover-dossiers-2024-05-01.json`.
    pub fn file_name(&self) -> String {
        let prefix = match self.kind() {
            ExportKind::Summary => "gromover-dossiers",
            ExportKind::Full => "gromover-admin-export",
        };
        format!("{prefix}-{}.json", self.exported_at().format("%Y-%m-%d"))
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Replaces blob references with inline data-URLs. A blob that has gone
/// missing keeps its reference and is logged; `ExportDocument::full`
/// counts those.
pub(crate) async fn inline_attachments(
    mut records: Vec<DossierRecord>,
    blobs: &dyn BlobStore,
) -> Result<Vec<DossierRecord>> {
    for record in &mut records {
        for file in &mut record.files {
            let AttachmentPayload::Blob { blob } = &file.payload else {
                continue;
            };
            let blob = blob.clone();
            match blobs.get(&blob).await.map_err(DossierError::storage)? {
                Some(bytes) => {
                    file.payload = AttachmentPayload::Inline {
                        data: data_url::encode(&file.media_type, &bytes),
                    };
                }
                None => {
                    warn!(id = record.id, blob = %blob, file = %file.name, "attachment blob missing from store");
                }
            }
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use chrono::TimeZone;
    use gd_core::{FileAttachment, MockBlobStore, NewDossier};

    fn record_with_blob(id: u64, blob: &str) -> DossierRecord {
        NewDossier {
            title: "t".into(),
            content: "c".into(),
            tags: vec!["x".into()],
            kind: DossierType::Anonymous,
            client_ip: "unknown".into(),
            moderated: false,
            files: vec![FileAttachment {
                name: "note.txt".into(),
                media_type: "text/plain".into(),
                size: 2,
                payload: AttachmentPayload::Blob { blob: blob.into() },
            }],
        }
        .into_record(id, Utc::now())
    }

    #[test]
    fn file_names_follow_kind_and_export_date() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 23, 59, 0).unwrap();
        assert_eq!(
            ExportDocument::summary(&[], at).file_name(),
            "gromover-dossiers-2024-05-01.json"
        );
        assert_eq!(
            ExportDocument::full(vec![], vec![], at).file_name(),
            "gromover-admin-export-2024-05-01.json"
        );
    }

    #[test]
    fn summary_keeps_counts_and_drops_payloads() {
        let doc = ExportDocument::summary(&[record_with_blob(1, "abc")], Utc::now());
        let json: serde_json::Value =
            serde_json::from_str(&doc.to_pretty_json().unwrap()).unwrap();
        assert_eq!(json["totalDossiers"], 1);
        assert_eq!(json["dossiers"][0]["filesCount"], 1);
        assert_eq!(json["dossiers"][0]["type"], "anonymous");
        assert!(json["dossiers"][0].get("files").is_none());
    }

    #[test]
    fn full_export_counts_pending() {
        let mut approved = record_with_blob(2, "b");
        approved.status = DossierStatus::Approved;
        let doc = ExportDocument::full(
            vec![record_with_blob(1, "a"), approved],
            vec!["1.2.3.4".into()],
            Utc::now(),
        );
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["totalDossiers"], 2);
        assert_eq!(json["pendingModeration"], 1);
        assert_eq!(json["blacklistedIPs"], serde_json::json!(["1.2.3.4"]));
        assert_eq!(json["missingAttachments"], 2);
    }

    #[tokio::test]
    async fn inline_attachments_resolves_blobs_and_keeps_missing_ones() {
        let mut blobs = MockBlobStore::new();
        blobs.expect_get().returning(|id| {
            Ok((id == "present").then(|| Bytes::from_static(b"hi")))
        });

        let records = inline_attachments(
            vec![record_with_blob(1, "present"), record_with_blob(2, "gone")],
            &blobs,
        )
        .await
        .unwrap();

        assert_eq!(
            records[0].files[0].payload,
            AttachmentPayload::Inline { data: "data:text/plain;base64,aGk=".into() }
        );
        assert_eq!(records[1].files[0].payload, AttachmentPayload::Blob { blob: "gone".into() });
    }
}
