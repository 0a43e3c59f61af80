//! # Domain Models
//!
//! These structs represent the persisted entities of the dossier store.
//! Field names on the wire match the JSON documents the site already keeps
//! under `dossierData` and `blacklistedIPs`.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::UNKNOWN_IP;

/// Whether the submitter chose to publish anonymously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DossierType {
    Anonymous,
    Public,
}

/// Moderation state of a record.
///
/// Records written before every creation path set a status load as `Pending`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DossierStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// One user-submitted testimonial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DossierRecord {
    /// Creation time in milliseconds, bumped past the previous id when two
    /// submissions land in the same millisecond.
    pub id: u64,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub kind: DossierType,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub status: DossierStatus,
    #[serde(rename = "clientIP", default = "unknown_ip")]
    pub client_ip: String,
    /// Set when the client IP was blacklisted at submission time. Never
    /// rewritten afterwards.
    #[serde(default)]
    pub moderated: bool,
    #[serde(default)]
    pub files: Vec<FileAttachment>,
}

impl DossierRecord {
    pub fn has_files(&self) -> bool {
        !self.files.is_empty()
    }
}

fn unknown_ip() -> String {
    UNKNOWN_IP.to_string()
}

/// Metadata for a file attached to a dossier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttachment {
    /// Original filename as uploaded; not sanitized.
    pub name: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub size: u64,
    #[serde(flatten)]
    pub payload: AttachmentPayload,
}

/// Where the bytes of an attachment live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttachmentPayload {
    /// SHA-256 hex digest of the content, resolved through a `BlobStore`.
    Blob { blob: String },
    /// Legacy form: the whole file inlined as a base64 data-URL.
    Inline { data: String },
}

/// A validated candidate record. The store assigns `id` and `timestamp`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDossier {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub kind: DossierType,
    pub client_ip: String,
    pub moderated: bool,
    pub files: Vec<FileAttachment>,
}

impl NewDossier {
    pub fn into_record(self, id: u64, timestamp: DateTime<Utc>) -> DossierRecord {
        DossierRecord {
            id,
            title: self.title,
            content: self.content,
            tags: self.tags,
            kind: self.kind,
            timestamp,
            status: DossierStatus::Pending,
            client_ip: self.client_ip,
            moderated: self.moderated,
            files: self.files,
        }
    }
}

/// What a submission from a blacklisted IP turns into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlacklistPolicy {
    /// Store the record as usual with `moderated: true`.
    #[default]
    Tag,
    /// Store nothing.
    Reject,
}

/// Shape of an export artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    /// Public listing export: file payloads dropped, counts kept.
    #[default]
    Summary,
    /// Admin export: full records with inline data-URLs plus the blacklist.
    Full,
}
