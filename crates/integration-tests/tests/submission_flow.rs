use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::DateTime;
use gd_core::{
    AttachmentPayload, BlacklistPolicy, DossierError, DossierStatus, DossierType, MockIpResolver,
    NoticeLevel, UNKNOWN_IP,
};
use gd_store::submission::DEFAULT_TESTIMONY_TITLE;
use gd_store::{
    AttachmentInput, AttachmentSource, SubmissionOrigin, SubmissionOutcome, SubmissionService,
};
use integration_tests::{form, memory_store, submission_service, StalledResolver};

fn bytes_attachment(name: &str, body: &'static [u8]) -> AttachmentInput {
    AttachmentInput {
        name: name.to_string(),
        media_type: None,
        source: AttachmentSource::Bytes(Bytes::from_static(body)),
    }
}

#[tokio::test]
async fn public_submission_without_files() {
    let store = memory_store();
    let service = submission_service(store.clone(), "1.2.3.4");

    let outcome = service
        .submit(form("Test", "Hello", DossierType::Public), SubmissionOrigin::AddDossier)
        .await
        .unwrap();
    assert!(matches!(outcome, SubmissionOutcome::Accepted(_)));

    let all = store.load_all().await.unwrap();
    assert_eq!(all.len(), 1);
    let record = &all[0];
    assert_eq!(record.kind, DossierType::Public);
    assert_eq!(record.status, DossierStatus::Pending);
    assert!(record.files.is_empty());
    assert!(!record.moderated);
    assert_eq!(record.client_ip, "1.2.3.4");

    let json = serde_json::to_value(record).unwrap();
    assert_eq!(json["type"], "public");
    assert_eq!(json["status"], "pending");
    assert_eq!(json["files"], serde_json::json!([]));
    let timestamp = json["timestamp"].as_str().unwrap();
    assert!(DateTime::parse_from_rfc3339(timestamp).is_ok());
}

#[tokio::test]
async fn tags_are_split_and_trimmed() {
    let store = memory_store();
    let service = submission_service(store.clone(), "1.2.3.4");
    let mut input = form("Tagged", "body", DossierType::Anonymous);
    input.tags = " scam, discord ,, gromover ".to_string();

    let outcome = service.submit(input, SubmissionOrigin::AddDossier).await.unwrap();
    assert_eq!(outcome.record().unwrap().tags, vec!["scam", "discord", "gromover"]);
}

#[tokio::test]
async fn blacklisted_ip_is_tagged_by_default() {
    let store = memory_store();
    store.add_to_blacklist("6.6.6.6").await.unwrap();
    let service = submission_service(store.clone(), "6.6.6.6");

    let outcome = service
        .submit(form("", "testimony", DossierType::Anonymous), SubmissionOrigin::Testimony)
        .await
        .unwrap();

    let SubmissionOutcome::Flagged(record) = &outcome else {
        panic!("expected flagged outcome, got {outcome:?}");
    };
    assert!(record.moderated);
    assert_eq!(record.status, DossierStatus::Pending);
    assert_eq!(record.title, DEFAULT_TESTIMONY_TITLE);
    assert_eq!(outcome.notice(SubmissionOrigin::Testimony).level, NoticeLevel::Warning);
    assert_eq!(store.load_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn seed_blacklist_entry_is_honoured() {
    let store = memory_store().with_seed_blacklist(vec!["92.52.166.230".to_string()]);
    let service = submission_service(store.clone(), "92.52.166.230");

    let outcome = service
        .submit(form("t", "c", DossierType::Public), SubmissionOrigin::AddDossier)
        .await
        .unwrap();
    assert!(matches!(outcome, SubmissionOutcome::Flagged(_)));
}

#[tokio::test]
async fn reject_policy_withholds_and_stores_nothing() {
    let store = memory_store();
    store.add_to_blacklist("6.6.6.6").await.unwrap();
    let service = submission_service(store.clone(), "6.6.6.6").with_policy(BlacklistPolicy::Reject);

    let outcome = service
        .submit(form("t", "c", DossierType::Public), SubmissionOrigin::AddDossier)
        .await
        .unwrap();
    assert_eq!(outcome, SubmissionOutcome::Withheld);
    assert!(outcome.record().is_none());
    assert!(store.load_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_lookup_records_unknown_ip() {
    let store = memory_store();
    let mut resolver = MockIpResolver::new();
    resolver.expect_resolve().returning(|| Err(anyhow::anyhow!("offline")));
    let service = SubmissionService::new(store.clone(), Arc::new(resolver));

    let outcome = service
        .submit(form("t", "c", DossierType::Public), SubmissionOrigin::AddDossier)
        .await
        .unwrap();
    assert_eq!(outcome.record().unwrap().client_ip, UNKNOWN_IP);
}

#[tokio::test]
async fn stalled_lookup_times_out_to_unknown() {
    let store = memory_store();
    let service = SubmissionService::new(store.clone(), Arc::new(StalledResolver))
        .with_lookup_timeout(Duration::from_millis(20));

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        service.submit(form("t", "c", DossierType::Public), SubmissionOrigin::AddDossier),
    )
    .await
    .expect("submission must not wait on the stalled lookup")
    .unwrap();
    assert_eq!(outcome.record().unwrap().client_ip, UNKNOWN_IP);
}

#[tokio::test]
async fn attachments_keep_input_order_and_land_in_blob_store() {
    let store = memory_store();
    let service = submission_service(store.clone(), "1.2.3.4");
    let mut input = form("with files", "see attached", DossierType::Public);
    input.attachments = vec![
        bytes_attachment("first.png", b"\x89PNG-one"),
        bytes_attachment("second.txt", b"two"),
        AttachmentInput {
            name: "third".to_string(),
            media_type: Some("application/pdf".to_string()),
            source: AttachmentSource::Bytes(Bytes::from_static(b"%PDF-three")),
        },
    ];

    let outcome = service.submit(input, SubmissionOrigin::AddDossier).await.unwrap();
    let files = &outcome.record().unwrap().files;

    let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["first.png", "second.txt", "third"]);
    assert_eq!(files[0].media_type, "image/png");
    assert_eq!(files[1].media_type, "text/plain");
    assert_eq!(files[2].media_type, "application/pdf");
    assert_eq!(files[1].size, 3);

    let AttachmentPayload::Blob { blob } = &files[1].payload else {
        panic!("new attachments are stored as blobs");
    };
    let content = store.blobs().get(blob).await.unwrap().unwrap();
    assert_eq!(content, Bytes::from_static(b"two"));
}

#[tokio::test]
async fn attachments_from_disk_are_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("screenshot.jpg");
    std::fs::write(&path, b"jpeg bytes").unwrap();

    let store = memory_store();
    let service = submission_service(store.clone(), "1.2.3.4");
    let mut input = form("disk", "file on disk", DossierType::Anonymous);
    input.attachments = vec![AttachmentInput {
        name: "screenshot.jpg".to_string(),
        media_type: None,
        source: AttachmentSource::Path(path),
    }];

    let outcome = service.submit(input, SubmissionOrigin::AddDossier).await.unwrap();
    let file = &outcome.record().unwrap().files[0];
    assert_eq!(file.size, 10);
    assert_eq!(file.media_type, "image/jpeg");
}

#[tokio::test]
async fn one_unreadable_attachment_persists_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = memory_store();
    let service = submission_service(store.clone(), "1.2.3.4");
    let mut input = form("broken", "one file is gone", DossierType::Public);
    input.attachments = vec![
        bytes_attachment("fine.txt", b"ok"),
        AttachmentInput {
            name: "missing.pdf".to_string(),
            media_type: None,
            source: AttachmentSource::Path(dir.path().join("missing.pdf")),
        },
    ];

    let err = service.submit(input.clone(), SubmissionOrigin::AddDossier).await.unwrap_err();
    assert!(matches!(err, DossierError::AttachmentRead { ref name, .. } if name == "missing.pdf"));
    assert!(store.load_all().await.unwrap().is_empty());

    let notice = service.submit_with_notice(input, SubmissionOrigin::AddDossier).await;
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notice.message.contains("missing.pdf"));
}

#[tokio::test]
async fn blank_content_is_rejected_before_lookup() {
    let store = memory_store();
    let mut resolver = MockIpResolver::new();
    resolver.expect_resolve().never();
    let service = SubmissionService::new(store.clone(), Arc::new(resolver));

    let err = service
        .submit(form("title", "   ", DossierType::Public), SubmissionOrigin::Testimony)
        .await
        .unwrap_err();
    assert!(matches!(err, DossierError::Validation(_)));
    assert!(store.load_all().await.unwrap().is_empty());
}
