//! Submission pipeline orchestration
//!
//! One run drives the four steps in order:
//! 1. Fetch - download the submitted file
//! 2. Archive - store whatever bytes arrived under the archive key
//! 3. Notify - email the student the success or failure template
//! 4. Audit - append a record of the notification attempt
//!
//! No step is skipped because an earlier one failed. Fetch and archive
//! failures turn the outcome to [`PipelineOutcome::Failed`]; notify and audit
//! failures are logged and reported but never change it.

use crate::archive::{self, ArchiveStore};
use crate::audit::{AuditLog, AuditRecorder};
use crate::config::Config;
use crate::error::Result;
use crate::fetch::{HttpFetcher, SubmissionFetcher};
use crate::notify::NotificationDispatcher;
use crate::trigger::decode_envelope;
use crate::types::{PipelineOutcome, RunReport, StepStatus, SubmissionEvent};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;

/// A record that was dropped before any step ran
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RejectedRecord {
    /// Position inside the batch
    pub index: usize,
    /// SNS message id, if the envelope had one
    pub message_id: Option<String>,
    /// Why the record could not be decoded
    pub error: String,
}

/// Result of handling one trigger payload
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct BatchReport {
    /// One report per decoded submission, in envelope order
    pub runs: Vec<RunReport>,
    /// Records whose message was not a submission
    pub rejected: Vec<RejectedRecord>,
}

/// Drives fetch, archive, notify and audit for each submission
///
/// Holds only collaborator handles, so one instance can serve any number of
/// concurrent runs.
#[derive(Clone)]
pub struct Pipeline {
    fetcher: Arc<dyn SubmissionFetcher>,
    archive: Arc<dyn ArchiveStore>,
    dispatcher: NotificationDispatcher,
    recorder: AuditRecorder,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("fetcher", &self.fetcher.name())
            .field("archive", &self.archive.name())
            .field("dispatcher", &self.dispatcher)
            .field("recorder", &self.recorder)
            .finish()
    }
}

impl Pipeline {
    /// Create a pipeline from its collaborators
    pub fn new(
        fetcher: Arc<dyn SubmissionFetcher>,
        archive: Arc<dyn ArchiveStore>,
        dispatcher: NotificationDispatcher,
        recorder: AuditRecorder,
    ) -> Self {
        Self {
            fetcher,
            archive,
            dispatcher,
            recorder,
        }
    }

    /// Build the production collaborators described by `config`
    ///
    /// The audit log is passed in because the caller usually keeps a handle
    /// to it for read-side queries.
    pub fn from_config(config: &Config, audit_log: Arc<dyn AuditLog>) -> Self {
        Self::new(
            Arc::new(HttpFetcher::new(&config.fetch)),
            archive::store_from_config(&config.storage),
            NotificationDispatcher::from_config(&config.mail),
            AuditRecorder::new(audit_log),
        )
    }

    /// Decode a trigger payload and run every submission it carries
    ///
    /// An undecodable envelope is returned as an error and nothing runs. A
    /// record whose message is not a submission is listed in
    /// [`BatchReport::rejected`] and the other records still run.
    ///
    /// Records run one after another in envelope order, so a later
    /// submission for the same archive key always overwrites an earlier one.
    pub async fn handle_payload(&self, payload: &[u8]) -> Result<BatchReport> {
        let messages = decode_envelope(payload).inspect_err(|e| {
            warn!(error = %e, "rejecting trigger payload");
        })?;

        let mut runs = Vec::with_capacity(messages.len());
        let mut rejected = Vec::new();
        for message in messages {
            match message.decode() {
                Ok(event) => runs.push(self.run(event).await),
                Err(e) => {
                    warn!(
                        index = message.index,
                        message_id = ?message.message_id,
                        error = %e,
                        "skipping undecodable record"
                    );
                    rejected.push(RejectedRecord {
                        index: message.index,
                        message_id: message.message_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(BatchReport { runs, rejected })
    }

    /// Run the pipeline for one submission
    ///
    /// Never fails: every step's result is captured in the returned report.
    pub async fn run(&self, event: SubmissionEvent) -> RunReport {
        let started_at = Utc::now();
        let archive_key = event.archive_key();
        let mut outcome = PipelineOutcome::default();

        info!(
            student = %event.student_email,
            assignment = %event.assignment_name,
            url = %event.submission_url,
            "processing submission"
        );

        // 1. Fetch
        let fetched = self.fetcher.fetch(&event.submission_url).await;
        let fetch = match &fetched.failure {
            None => StepStatus::Succeeded,
            Some(e) => {
                warn!(
                    url = %event.submission_url,
                    fetcher = self.fetcher.name(),
                    partial_bytes = fetched.body.len(),
                    error = %e,
                    "submission fetch failed"
                );
                StepStatus::Failed {
                    error: e.to_string(),
                }
            }
        };
        outcome = outcome.fold(fetched.is_success());

        // 2. Archive (runs even when the fetch failed)
        let content = fetched.body;
        let archived_bytes = content.len() as u64;
        let content_sha256 = format!("{:x}", Sha256::digest(&content));
        let stored = self.archive.store(&archive_key, content).await;
        match &stored {
            Ok(receipt) => info!(
                key = %archive_key,
                location = %receipt.location,
                bytes = receipt.bytes,
                sha256 = %content_sha256,
                "submission archived"
            ),
            Err(e) => warn!(
                key = %archive_key,
                store = self.archive.name(),
                error = %e,
                "archive write failed"
            ),
        }
        let archive = StepStatus::from_result(&stored);
        outcome = outcome.fold_result(&stored);

        // 3. Notify; the outcome is fixed from here on
        let dispatched = self
            .dispatcher
            .send(
                &event.student_email,
                outcome,
                &event.submission_url,
                &event.assignment_name,
            )
            .await;
        let notify = match &dispatched.failure {
            None => StepStatus::Succeeded,
            Some(e) => {
                warn!(
                    recipient = %event.student_email,
                    outcome = %outcome,
                    error = %e,
                    "notification dispatch failed"
                );
                StepStatus::Failed {
                    error: e.to_string(),
                }
            }
        };

        // 4. Audit
        let recorded = self
            .recorder
            .record(&dispatched.id, &event.student_email, outcome, Utc::now())
            .await;
        if let Err(e) = &recorded {
            warn!(
                recipient = %event.student_email,
                sent_id = %dispatched.id,
                error = %e,
                "audit record not written"
            );
        }
        let audit = StepStatus::from_result(&recorded);

        let dispatch_id = (!dispatched.id.is_empty()).then_some(dispatched.id);

        info!(
            student = %event.student_email,
            assignment = %event.assignment_name,
            outcome = %outcome,
            "submission processed"
        );

        RunReport {
            event,
            archive_key,
            outcome,
            fetch,
            archive,
            notify,
            audit,
            dispatch_id,
            audit_record_id: recorded.ok(),
            archived_bytes,
            content_sha256,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
