//! # Submission Flow
//!
//! Turns a filled-in form into a stored dossier: validate, resolve the client
//! IP, apply the blacklist policy, persist attachments, then append.
//!
//! Attachments are read concurrently but land in the record in input order.
//! If any of them cannot be read the submission fails and nothing is stored.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::future::try_join_all;
use gd_core::validation::{parse_tags, require_text};
use gd_core::{
    AttachmentPayload, BlacklistPolicy, DossierError, DossierRecord, DossierType, FileAttachment,
    IpResolver, NewDossier, Notice, Result, UNKNOWN_IP,
};
use tracing::{debug, info, instrument, warn};

use crate::store::DossierStore;

/// Title given to landing-page testimonies submitted without one.
pub const DEFAULT_TESTIMONY_TITLE: &str = "Анонимное свидетельство";

pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Which form the submission came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOrigin {
    /// Landing-page testimony form; the title is optional.
    Testimony,
    /// "Add dossier" dialog on the dossiers page; title and content required.
    AddDossier,
}

#[derive(Debug, Clone)]
pub struct SubmissionForm {
    pub title: String,
    pub content: String,
    /// Raw comma-delimited tag input.
    pub tags: String,
    pub kind: DossierType,
    pub attachments: Vec<AttachmentInput>,
}

#[derive(Debug, Clone)]
pub struct AttachmentInput {
    pub name: String,
    /// Media type reported by the client; guessed from `name` when absent.
    pub media_type: Option<String>,
    pub source: AttachmentSource,
}

#[derive(Debug, Clone)]
pub enum AttachmentSource {
    Bytes(Bytes),
    Path(PathBuf),
}

impl AttachmentSource {
    async fn read(self) -> std::io::Result<Bytes> {
        match self {
            AttachmentSource::Bytes(bytes) => Ok(bytes),
            AttachmentSource::Path(path) => tokio::fs::read(&path).await.map(Bytes::from),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Accepted(DossierRecord),
    /// Stored, but the client IP was blacklisted.
    Flagged(DossierRecord),
    /// Blacklisted under `BlacklistPolicy::Reject`; nothing was stored.
    Withheld,
}

impl SubmissionOutcome {
    pub fn record(&self) -> Option<&DossierRecord> {
        match self {
            SubmissionOutcome::Accepted(record) | SubmissionOutcome::Flagged(record) => {
                Some(record)
            }
            SubmissionOutcome::Withheld => None,
        }
    }

    pub fn notice(&self, origin: SubmissionOrigin) -> Notice {
        match (self, origin) {
            (SubmissionOutcome::Accepted(_), SubmissionOrigin::AddDossier) => {
                Notice::success("Досье успешно добавлено!")
            }
            (SubmissionOutcome::Accepted(_), SubmissionOrigin::Testimony) => Notice::success(
                "Свидетельство отправлено! Спасибо за ваш вклад в разоблачение правды.",
            ),
            (SubmissionOutcome::Flagged(_), _) => {
                Notice::warning("Свидетельство сохранено и будет проверено модератором.")
            }
            (SubmissionOutcome::Withheld, _) => {
                Notice::warning("Свидетельство не принято: отправка с этого адреса ограничена.")
            }
        }
    }
}

pub struct SubmissionService {
    store: DossierStore,
    resolver: Arc<dyn IpResolver>,
    policy: BlacklistPolicy,
    lookup_timeout: Duration,
}

impl SubmissionService {
    pub fn new(store: DossierStore, resolver: Arc<dyn IpResolver>) -> Self {
        Self {
            store,
            resolver,
            policy: BlacklistPolicy::default(),
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    pub fn with_policy(mut self, policy: BlacklistPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    #[instrument(skip_all, fields(origin = ?origin, attachments = form.attachments.len()))]
    pub async fn submit(
        &self,
        form: SubmissionForm,
        origin: SubmissionOrigin,
    ) -> Result<SubmissionOutcome> {
        let SubmissionForm { title, content, tags, kind, attachments } = form;
        let title = match origin {
            SubmissionOrigin::Testimony if title.trim().is_empty() => {
                DEFAULT_TESTIMONY_TITLE.to_string()
            }
            _ => require_text("title", &title)?,
        };
        let content = require_text("content", &content)?;

        let client_ip = self.resolve_client_ip().await;
        let flagged = self.store.is_blacklisted(&client_ip).await?;
        if flagged && self.policy == BlacklistPolicy::Reject {
            info!(ip = %client_ip, "submission from blacklisted ip withheld");
            return Ok(SubmissionOutcome::Withheld);
        }

        let files = self.store_attachments(attachments).await?;
        let record = self
            .store
            .append(NewDossier {
                title,
                content,
                tags: parse_tags(&tags),
                kind,
                client_ip,
                moderated: flagged,
                files,
            })
            .await?;

        if flagged {
            info!(id = record.id, ip = %record.client_ip, "submission from blacklisted ip flagged");
            Ok(SubmissionOutcome::Flagged(record))
        } else {
            Ok(SubmissionOutcome::Accepted(record))
        }
    }

    /// Entry point for form handlers: never fails, always yields something to
    /// show the visitor.
    pub async fn submit_with_notice(&self, form: SubmissionForm, origin: SubmissionOrigin) -> Notice {
        match self.submit(form, origin).await {
            Ok(outcome) => outcome.notice(origin),
            Err(err) => {
                warn!(error = %err, "submission failed");
                Notice::from(&err)
            }
        }
    }

    /// Best effort: any failure or a lookup slower than the timeout gives
    /// `"unknown"`.
    async fn resolve_client_ip(&self) -> String {
        match tokio::time::timeout(self.lookup_timeout, self.resolver.resolve()).await {
            Ok(Ok(ip)) if !ip.trim().is_empty() => ip.trim().to_string(),
            Ok(Ok(_)) => {
                warn!("ip lookup returned an empty address");
                UNKNOWN_IP.to_string()
            }
            Ok(Err(err)) => {
                warn!(error = %err, "ip lookup failed");
                UNKNOWN_IP.to_string()
            }
            Err(_) => {
                warn!(timeout_ms = self.lookup_timeout.as_millis() as u64, "ip lookup timed out");
                UNKNOWN_IP.to_string()
            }
        }
    }

    async fn store_attachments(&self, inputs: Vec<AttachmentInput>) -> Result<Vec<FileAttachment>> {
        let blobs = self.store.blobs();
        let uploads = inputs.into_iter().map(|input| async move {
            let AttachmentInput { name, media_type, source } = input;
            let bytes = source.read().await.map_err(|err| DossierError::AttachmentRead {
                name: name.clone(),
                reason: err.to_string(),
            })?;
            let media_type = media_type
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| guess_media_type(&name));
            let size = bytes.len() as u64;
            let blob = blobs.put(bytes).await.map_err(DossierError::storage)?;
            debug!(file = %name, size, blob = %blob, "attachment stored");
            Ok::<_, DossierError>(FileAttachment {
                name,
                media_type,
                size,
                payload: AttachmentPayload::Blob { blob },
            })
        });
        try_join_all(uploads).await
    }
}

fn guess_media_type(name: &str) -> String {
    mime_guess::from_path(name).first_or_octet_stream().to_string()
}
