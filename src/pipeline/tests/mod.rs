use super::test_helpers::*;
use super::*;
use crate::error::{DecodeError, DispatchError};
use crate::Error;
use bytes::Bytes;
use std::time::Duration;

#[tokio::test]
async fn test_successful_submission() {
    let h = default_harness();

    let report = h
        .pipeline
        .run(submission("a@x.com", "https://ok/file"))
        .await;

    assert_eq!(report.outcome, PipelineOutcome::Succeeded);
    assert!(report.fetch.is_success());
    assert!(report.archive.is_success());
    assert!(report.notify.is_success());
    assert!(report.audit.is_success());

    // Archived under the deterministic key
    assert_eq!(report.archive_key.as_str(), "HW1a@x.com submission");
    assert_eq!(
        h.archive.object("HW1a@x.com submission").unwrap(),
        &b"data"[..]
    );
    assert_eq!(report.archived_bytes, 4);
    assert_eq!(
        report.content_sha256,
        "3a6eb0790f39ac87c94f3856b2dd2c5d110e6811602261a9a923d3bb23adc8b7"
    );

    // Success template to the student
    let sent = h.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "a@x.com");
    assert_eq!(sent[0].subject, "Assignment Submission Confirmation: HW1");

    // One audit row with status 1 and the returned id
    let records = h.audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, 1);
    assert_eq!(records[0].to_email_address, "a@x.com");
    assert_eq!(records[0].sent_id, "<1@mg.test>");
    assert_eq!(report.dispatch_id.unwrap().as_str(), "<1@mg.test>");
    assert_eq!(report.audit_record_id, Some(1));
}

#[tokio::test]
async fn test_not_found_download_still_archives_partial_body() {
    let h = default_harness();

    let report = h
        .pipeline
        .run(submission("b@x.com", "https://missing/file"))
        .await;

    assert_eq!(report.outcome, PipelineOutcome::Failed);
    assert!(!report.fetch.is_success());
    assert!(report.archive.is_success());

    // Archive step ran with the error body
    assert_eq!(*h.archive.writes.lock().unwrap(), 1);
    assert_eq!(
        h.archive.object("HW1b@x.com submission").unwrap(),
        &b"Not Found"[..]
    );

    let sent = h.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Action Required: Assignment Submission Failed");

    let records = h.audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, 0);
}

#[tokio::test]
async fn test_unreachable_download_archives_empty_content() {
    let h = default_harness();

    let report = h
        .pipeline
        .run(submission("c@x.com", "https://unreachable/file"))
        .await;

    assert_eq!(report.outcome, PipelineOutcome::Failed);
    assert_eq!(report.archived_bytes, 0);
    assert_eq!(
        h.archive.object("HW1c@x.com submission").unwrap(),
        Bytes::new()
    );
    assert_eq!(h.audit.records()[0].status, 0);
}

#[tokio::test]
async fn test_archive_failure_fails_outcome() {
    let h = harness(
        FakeFetcher::default().with("https://ok/file", Reply::Body("data")),
        MemoryArchive::refusing(),
        CapturingMailer::default(),
        MemoryAuditLog::default(),
    );

    let report = h
        .pipeline
        .run(submission("a@x.com", "https://ok/file"))
        .await;

    assert!(report.fetch.is_success());
    assert!(matches!(report.archive, StepStatus::Failed { .. }));
    assert_eq!(report.outcome, PipelineOutcome::Failed);

    assert_eq!(
        h.mailer.sent()[0].subject,
        "Action Required: Assignment Submission Failed"
    );
    assert_eq!(h.audit.records()[0].status, 0);
}

#[tokio::test]
async fn test_outcome_is_and_of_fetch_and_archive() {
    for fetch_ok in [true, false] {
        for archive_ok in [true, false] {
            let archive = if archive_ok {
                MemoryArchive::default()
            } else {
                MemoryArchive::refusing()
            };
            let h = harness(
                FakeFetcher::default().with("https://ok/file", Reply::Body("data")),
                archive,
                CapturingMailer::default(),
                MemoryAuditLog::default(),
            );
            let url = if fetch_ok {
                "https://ok/file"
            } else {
                "https://unreachable/file"
            };

            let report = h.pipeline.run(submission("a@x.com", url)).await;

            assert_eq!(
                report.outcome.is_success(),
                fetch_ok && archive_ok,
                "fetch_ok={fetch_ok} archive_ok={archive_ok}"
            );
            assert_eq!(
                h.audit.records()[0].status,
                report.outcome.status_code()
            );
        }
    }
}

#[tokio::test]
async fn test_notify_and_audit_run_exactly_once_whatever_the_failures() {
    let cases = [
        ("https://ok/file", false),
        ("https://missing/file", false),
        ("https://ok/file", true),
        ("https://unreachable/file", true),
    ];

    for (url, refuse_archive) in cases {
        let archive = if refuse_archive {
            MemoryArchive::refusing()
        } else {
            MemoryArchive::default()
        };
        let h = harness(
            FakeFetcher::default()
                .with("https://ok/file", Reply::Body("data"))
                .with("https://missing/file", Reply::Status(404, "")),
            archive,
            CapturingMailer::default(),
            MemoryAuditLog::default(),
        );

        h.pipeline.run(submission("a@x.com", url)).await;

        assert_eq!(h.fetcher.calls.lock().unwrap().len(), 1);
        assert_eq!(*h.archive.writes.lock().unwrap(), 1);
        assert_eq!(h.mailer.sent().len(), 1, "url={url} refuse={refuse_archive}");
        assert_eq!(h.audit.records().len(), 1, "url={url} refuse={refuse_archive}");
    }
}

#[tokio::test]
async fn test_dispatch_failure_does_not_change_outcome() {
    let h = harness(
        FakeFetcher::default().with("https://ok/file", Reply::Body("data")),
        MemoryArchive::default(),
        CapturingMailer::new(MailerMode::Reject),
        MemoryAuditLog::default(),
    );

    let report = h
        .pipeline
        .run(submission("a@x.com", "https://ok/file"))
        .await;

    assert_eq!(report.outcome, PipelineOutcome::Succeeded);
    assert!(!report.notify.is_success());
    assert!(report.dispatch_id.is_none());

    let records = h.audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, 1);
    assert_eq!(records[0].sent_id, "");
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_timeout_still_audits_fixed_outcome() {
    let h = harness(
        FakeFetcher::default().with("https://missing/file", Reply::Status(404, "")),
        MemoryArchive::default(),
        CapturingMailer::new(MailerMode::Hang),
        MemoryAuditLog::default(),
    );

    let started = tokio::time::Instant::now();
    let report = h
        .pipeline
        .run(submission("a@x.com", "https://missing/file"))
        .await;

    // Abandoned at the 30 second bound, not when the mailer would have answered
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(30));
    assert!(elapsed < Duration::from_secs(3600));

    match &report.notify {
        StepStatus::Failed { error } => {
            assert_eq!(
                error,
                &DispatchError::TimedOut {
                    after: Duration::from_secs(30)
                }
                .to_string()
            );
        }
        other => panic!("expected timed out dispatch, got {other:?}"),
    }
    assert!(report.dispatch_id.is_none());
    assert_eq!(report.outcome, PipelineOutcome::Failed);

    let records = h.audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].sent_id, "");
    assert_eq!(records[0].status, 0);
}

#[tokio::test]
async fn test_audit_failure_is_reported_not_raised() {
    let h = harness(
        FakeFetcher::default().with("https://ok/file", Reply::Body("data")),
        MemoryArchive::default(),
        CapturingMailer::default(),
        MemoryAuditLog {
            refuse: true,
            ..Default::default()
        },
    );

    let report = h
        .pipeline
        .run(submission("a@x.com", "https://ok/file"))
        .await;

    assert_eq!(report.outcome, PipelineOutcome::Succeeded);
    assert!(!report.audit.is_success());
    assert!(report.audit_record_id.is_none());
    assert_eq!(h.mailer.sent().len(), 1);
}

#[tokio::test]
async fn test_resubmission_overwrites_archive_but_appends_audit() {
    let h = harness(
        FakeFetcher::default()
            .with("https://ok/first", Reply::Body("first"))
            .with("https://ok/second", Reply::Body("second")),
        MemoryArchive::default(),
        CapturingMailer::default(),
        MemoryAuditLog::default(),
    );

    h.pipeline
        .run(submission("a@x.com", "https://ok/first"))
        .await;
    h.pipeline
        .run(submission("a@x.com", "https://ok/second"))
        .await;

    let objects = h.archive.objects.lock().unwrap().clone();
    assert_eq!(objects.len(), 1);
    assert_eq!(
        objects.get("HW1a@x.com submission").unwrap(),
        &Bytes::from_static(b"second")
    );
    assert_eq!(h.audit.records().len(), 2);
}

#[tokio::test]
async fn test_malformed_payload_has_no_side_effects() {
    let h = default_harness();

    let result = h.pipeline.handle_payload(b"{not json").await;

    assert!(matches!(
        result,
        Err(Error::Decode(DecodeError::InvalidEnvelope(_)))
    ));
    assert!(h.fetcher.calls.lock().unwrap().is_empty());
    assert_eq!(*h.archive.writes.lock().unwrap(), 0);
    assert!(h.mailer.sent().is_empty());
    assert!(h.audit.records().is_empty());
}

#[tokio::test]
async fn test_empty_batch_is_rejected() {
    let h = default_harness();

    let result = h.pipeline.handle_payload(&sns_batch(&[])).await;

    assert!(matches!(result, Err(Error::Decode(DecodeError::EmptyBatch))));
    assert!(h.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_batch_runs_every_record_and_skips_bad_ones() {
    let h = default_harness();
    let payload = sns_batch(&[
        message_for(&submission("a@x.com", "https://ok/file")),
        "not a submission".to_string(),
        message_for(&submission("b@x.com", "https://missing/file")),
    ]);

    let batch = h.pipeline.handle_payload(&payload).await.unwrap();

    assert_eq!(batch.runs.len(), 2);
    assert_eq!(batch.runs[0].event.student_email, "a@x.com");
    assert_eq!(batch.runs[0].outcome, PipelineOutcome::Succeeded);
    assert_eq!(batch.runs[1].event.student_email, "b@x.com");
    assert_eq!(batch.runs[1].outcome, PipelineOutcome::Failed);

    assert_eq!(batch.rejected.len(), 1);
    assert_eq!(batch.rejected[0].index, 1);
    assert_eq!(batch.rejected[0].message_id.as_deref(), Some("m-1"));

    assert_eq!(h.mailer.sent().len(), 2);
    assert_eq!(h.audit.records().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_batch_archives_latest_record_for_same_key() {
    let h = harness(
        FakeFetcher::default()
            .with(
                "https://ok/first",
                Reply::Slow(Duration::from_millis(200), "first attempt"),
            )
            .with("https://ok/second", Reply::Body("second attempt")),
        MemoryArchive::default(),
        CapturingMailer::default(),
        MemoryAuditLog::default(),
    );
    let payload = sns_batch(&[
        message_for(&submission("a@x.com", "https://ok/first")),
        message_for(&submission("a@x.com", "https://ok/second")),
    ]);

    let batch = h.pipeline.handle_payload(&payload).await.unwrap();

    assert_eq!(batch.runs.len(), 2);
    assert_eq!(
        *h.fetcher.calls.lock().unwrap(),
        vec!["https://ok/first", "https://ok/second"]
    );
    assert_eq!(
        h.archive.object("HW1a@x.com submission").unwrap(),
        &b"second attempt"[..]
    );

    // Audit rows follow envelope order too
    let records = h.audit.records();
    assert_eq!(records[0].sent_id, "<1@mg.test>");
    assert_eq!(records[1].sent_id, "<2@mg.test>");
}

#[tokio::test]
async fn test_batch_record_of_other_type_is_rejected_alone() {
    let h = default_harness();
    let payload = serde_json::json!({
        "Records": [
            {"Sns": {
                "Type": "SubscriptionConfirmation",
                "MessageId": "m-sub",
                "Message": "You have chosen to subscribe to the topic",
            }},
            {"Sns": {
                "Type": "Notification",
                "MessageId": "m-ok",
                "Message": message_for(&submission("a@x.com", "https://ok/file")),
            }},
        ]
    })
    .to_string();

    let batch = h.pipeline.handle_payload(payload.as_bytes()).await.unwrap();

    assert_eq!(batch.runs.len(), 1);
    assert_eq!(batch.runs[0].event.student_email, "a@x.com");
    assert_eq!(batch.rejected.len(), 1);
    assert_eq!(batch.rejected[0].index, 0);
    assert_eq!(batch.rejected[0].message_id.as_deref(), Some("m-sub"));
    assert!(batch.rejected[0].error.contains("SubscriptionConfirmation"));
    assert_eq!(h.mailer.sent().len(), 1);
}

#[tokio::test]
async fn test_http_notification_payload() {
    let h = default_harness();
    let payload = serde_json::json!({
        "Type": "Notification",
        "MessageId": "m-http",
        "Message": message_for(&submission("a@x.com", "https://ok/file")),
    })
    .to_string();

    let batch = h.pipeline.handle_payload(payload.as_bytes()).await.unwrap();

    assert_eq!(batch.runs.len(), 1);
    assert!(batch.rejected.is_empty());
    assert_eq!(batch.runs[0].outcome, PipelineOutcome::Succeeded);
}

#[tokio::test]
async fn test_empty_fields_flow_through() {
    let h = default_harness();

    let report = h
        .pipeline
        .run(SubmissionEvent {
            student_email: String::new(),
            submission_url: String::new(),
            assignment_name: String::new(),
        })
        .await;

    assert_eq!(report.archive_key.as_str(), " submission");
    assert_eq!(report.outcome, PipelineOutcome::Failed);
    assert_eq!(h.mailer.sent()[0].to, "");
    assert_eq!(h.audit.records().len(), 1);
}

#[test]
fn test_batch_report_serializes_runs_and_rejections() {
    let batch = BatchReport {
        runs: vec![],
        rejected: vec![RejectedRecord {
            index: 2,
            message_id: None,
            error: "bad".to_string(),
        }],
    };

    let json = serde_json::to_value(&batch).unwrap();
    assert_eq!(json["runs"], serde_json::json!([]));
    assert_eq!(json["rejected"][0]["index"], 2);
}

