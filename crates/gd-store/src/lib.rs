//! # gd-store
//!
//! The dossier store and the flows built on top of it.
//!
//! `DossierStore` is the only code that touches the serialized documents.
//! Submission and moderation go through it; the query helpers work on
//! collections it has already loaded.

pub mod store;
pub mod submission;
pub mod moderation;
pub mod query;
pub mod stats;
pub mod export;
pub mod data_url;

pub use store::DossierStore;
pub use submission::{AttachmentInput, AttachmentSource, SubmissionForm, SubmissionOrigin, SubmissionOutcome, SubmissionService};
pub use moderation::ModerationService;
pub use query::DossierFilter;
pub use stats::DossierStats;
pub use export::ExportDocument;
