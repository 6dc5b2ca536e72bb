//! In-memory collaborators for exercising the pipeline without network or disk.

use crate::archive::{ArchiveReceipt, ArchiveStore};
use crate::audit::{AuditLog, AuditRecorder};
use crate::error::{ArchiveError, DatabaseError, DispatchError, FetchError};
use crate::fetch::{Fetched, SubmissionFetcher};
use crate::notify::{EmailMessage, Mailer, NotificationDispatcher};
use crate::pipeline::Pipeline;
use crate::types::{ArchiveKey, DispatchId, DispatchRecord, SubmissionEvent};
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

/// How the fake fetcher answers a URL
#[derive(Clone, Debug)]
pub(crate) enum Reply {
    /// 200 with this body
    Body(&'static str),
    /// Non-success status with this body
    Status(u16, &'static str),
    /// 200 with this body, after a delay
    Slow(Duration, &'static str),
}

/// Fetcher answering from a fixed table; unknown URLs are unreachable
#[derive(Default)]
pub(crate) struct FakeFetcher {
    replies: HashMap<String, Reply>,
    pub(crate) calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub(crate) fn with(mut self, url: &str, reply: Reply) -> Self {
        self.replies.insert(url.to_string(), reply);
        self
    }
}

#[async_trait]
impl SubmissionFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Fetched {
        self.calls.lock().unwrap().push(url.to_string());
        match self.replies.get(url) {
            Some(Reply::Body(body)) => Fetched::complete(Bytes::from_static(body.as_bytes())),
            Some(Reply::Slow(delay, body)) => {
                tokio::time::sleep(*delay).await;
                Fetched::complete(Bytes::from_static(body.as_bytes()))
            }
            Some(Reply::Status(status, body)) => Fetched::failed(
                Bytes::from_static(body.as_bytes()),
                FetchError::Status {
                    url: url.to_string(),
                    status: *status,
                },
            ),
            None => Fetched::failed(
                Bytes::new(),
                FetchError::Transport {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                },
            ),
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Archive keeping objects in a map, optionally refusing every write
#[derive(Default)]
pub(crate) struct MemoryArchive {
    pub(crate) objects: Mutex<HashMap<String, Bytes>>,
    pub(crate) writes: Mutex<usize>,
    pub(crate) refuse: bool,
}

impl MemoryArchive {
    pub(crate) fn refusing() -> Self {
        Self {
            refuse: true,
            ..Default::default()
        }
    }

    pub(crate) fn object(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl ArchiveStore for MemoryArchive {
    async fn store(&self, key: &ArchiveKey, content: Bytes) -> std::result::Result<ArchiveReceipt, ArchiveError> {
        *self.writes.lock().unwrap() += 1;
        if self.refuse {
            return Err(ArchiveError::Auth("invalid_grant".to_string()));
        }
        let bytes = content.len() as u64;
        self.objects
            .lock()
            .unwrap()
            .insert(key.as_str().to_string(), content);
        Ok(ArchiveReceipt {
            location: format!("mem://{}", key),
            bytes,
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// How the fake mailer behaves
#[derive(Clone, Copy, Debug, Default)]
pub(crate) enum MailerMode {
    /// Accept every message
    #[default]
    Accept,
    /// Reject every message
    Reject,
    /// Never answer within any reasonable bound
    Hang,
}

/// Mailer capturing every message it is asked to send
#[derive(Default)]
pub(crate) struct CapturingMailer {
    pub(crate) sent: Mutex<Vec<EmailMessage>>,
    pub(crate) mode: MailerMode,
}

impl CapturingMailer {
    pub(crate) fn new(mode: MailerMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub(crate) fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for CapturingMailer {
    async fn send(&self, message: &EmailMessage) -> std::result::Result<DispatchId, DispatchError> {
        let count = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(message.clone());
            sent.len()
        };
        match self.mode {
            MailerMode::Accept => Ok(DispatchId::new(format!("<{}@mg.test>", count))),
            MailerMode::Reject => Err(DispatchError::Rejected {
                status: 401,
                body: "Forbidden".to_string(),
            }),
            MailerMode::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(DispatchId::new("<too-late@mg.test>"))
            }
        }
    }

    fn name(&self) -> &'static str {
        "capturing"
    }
}

/// Audit log keeping records in memory, optionally refusing every insert
#[derive(Default)]
pub(crate) struct MemoryAuditLog {
    pub(crate) records: Mutex<Vec<DispatchRecord>>,
    pub(crate) refuse: bool,
}

impl MemoryAuditLog {
    pub(crate) fn records(&self) -> Vec<DispatchRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn append(&self, record: &DispatchRecord) -> Result<i64> {
        if self.refuse {
            return Err(Error::Database(DatabaseError::QueryFailed(
                "audit store unavailable".to_string(),
            )));
        }
        let mut records = self.records.lock().unwrap();
        records.push(record.clone());
        Ok(records.len() as i64)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Handles to every fake behind a [`Pipeline`]
pub(crate) struct Harness {
    pub(crate) pipeline: Pipeline,
    pub(crate) fetcher: Arc<FakeFetcher>,
    pub(crate) archive: Arc<MemoryArchive>,
    pub(crate) mailer: Arc<CapturingMailer>,
    pub(crate) audit: Arc<MemoryAuditLog>,
}

/// Wire the given fakes into a pipeline with a 30-second dispatch bound
pub(crate) fn harness(
    fetcher: FakeFetcher,
    archive: MemoryArchive,
    mailer: CapturingMailer,
    audit: MemoryAuditLog,
) -> Harness {
    let fetcher = Arc::new(fetcher);
    let archive = Arc::new(archive);
    let mailer = Arc::new(mailer);
    let audit = Arc::new(audit);

    let pipeline = Pipeline::new(
        fetcher.clone(),
        archive.clone(),
        NotificationDispatcher::new(
            mailer.clone(),
            "mailgun@mg.test",
            Duration::from_secs(30),
        ),
        AuditRecorder::new(audit.clone()),
    );

    Harness {
        pipeline,
        fetcher,
        archive,
        mailer,
        audit,
    }
}

/// Pipeline whose fetcher serves `https://ok/file` with "data" and 404s `https://missing/file`
pub(crate) fn default_harness() -> Harness {
    harness(
        FakeFetcher::default()
            .with("https://ok/file", Reply::Body("data"))
            .with("https://missing/file", Reply::Status(404, "Not Found")),
        MemoryArchive::default(),
        CapturingMailer::default(),
        MemoryAuditLog::default(),
    )
}

/// A submission for `email` at `url` for assignment HW1
pub(crate) fn submission(email: &str, url: &str) -> SubmissionEvent {
    SubmissionEvent {
        student_email: email.to_string(),
        submission_url: url.to_string(),
        assignment_name: "HW1".to_string(),
    }
}

/// SNS batch envelope carrying the given raw message bodies
pub(crate) fn sns_batch(messages: &[String]) -> Vec<u8> {
    let records: Vec<serde_json::Value> = messages
        .iter()
        .enumerate()
        .map(|(i, message)| {
            serde_json::json!({
                "EventSource": "aws:sns",
                "Sns": {
                    "Type": "Notification",
                    "MessageId": format!("m-{}", i),
                    "Message": message,
                }
            })
        })
        .collect();
    serde_json::json!({ "Records": records }).to_string().into_bytes()
}

/// JSON message body for a submission
pub(crate) fn message_for(event: &SubmissionEvent) -> String {
    serde_json::to_string(event).unwrap()
}
