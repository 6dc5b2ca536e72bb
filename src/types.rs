//! Core types for submission-relay

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// A student's submission, decoded from one trigger record
///
/// Fields are taken verbatim from the message; empty strings are accepted
/// and flow through to the steps that use them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SubmissionEvent {
    /// Recipient of the outcome email
    pub student_email: String,
    /// Where the submitted file can be downloaded
    pub submission_url: String,
    /// Assignment the submission belongs to
    pub assignment_name: String,
}

impl SubmissionEvent {
    /// Key under which this submission is archived
    pub fn archive_key(&self) -> ArchiveKey {
        ArchiveKey::derive(&self.assignment_name, &self.student_email)
    }
}

/// Overall status of one pipeline run
///
/// Starts as `Succeeded` and moves to `Failed` on the first failing step.
/// There is no transition back.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// Submission fetched and archived
    #[default]
    Succeeded,
    /// Fetch or archive failed
    Failed,
}

impl PipelineOutcome {
    /// Fold one step result into the outcome
    #[must_use]
    pub fn fold(self, step_succeeded: bool) -> Self {
        match (self, step_succeeded) {
            (PipelineOutcome::Succeeded, true) => PipelineOutcome::Succeeded,
            _ => PipelineOutcome::Failed,
        }
    }

    /// Fold a step's `Result` into the outcome
    #[must_use]
    pub fn fold_result<T, E>(self, result: &std::result::Result<T, E>) -> Self {
        self.fold(result.is_ok())
    }

    /// Whether the run is still successful
    pub fn is_success(self) -> bool {
        self == PipelineOutcome::Succeeded
    }

    /// Numeric code stored in the audit log (1 = succeeded, 0 = failed)
    pub fn status_code(self) -> i32 {
        match self {
            PipelineOutcome::Succeeded => 1,
            PipelineOutcome::Failed => 0,
        }
    }

    /// Inverse of [`status_code`](Self::status_code); anything but 1 is `Failed`
    pub fn from_status_code(code: i32) -> Self {
        if code == 1 {
            PipelineOutcome::Succeeded
        } else {
            PipelineOutcome::Failed
        }
    }
}

impl fmt::Display for PipelineOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineOutcome::Succeeded => f.write_str("succeeded"),
            PipelineOutcome::Failed => f.write_str("failed"),
        }
    }
}

/// Deterministic object name for an archived submission
///
/// The archive keeps only the latest submission per assignment and student,
/// so the key carries no timestamp or counter.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ArchiveKey(String);

impl ArchiveKey {
    /// Build the key as `assignment_name + student_email + " submission"`
    pub fn derive(assignment_name: &str, student_email: &str) -> Self {
        Self(format!("{assignment_name}{student_email} submission"))
    }

    /// Borrow the key as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArchiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier the mail backend assigns to a send attempt
///
/// Empty when the dispatch failed before the backend answered.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct DispatchId(String);

impl DispatchId {
    /// Create a dispatch id from the backend's value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the backend returned no id
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DispatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Audit entry describing one notification attempt
///
/// Serialized with the field names the audit table has always used.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRecord {
    /// Dispatch id returned by the mail backend (may be empty)
    pub sent_id: String,
    /// Student the email was addressed to
    pub to_email_address: String,
    /// 1 when the submission was archived, 0 otherwise
    pub status: i32,
    /// RFC 3339 wall-clock time of the attempt
    pub time: String,
}

impl DispatchRecord {
    /// Build the record for a finished dispatch
    pub fn new(
        dispatch_id: &DispatchId,
        recipient: &str,
        outcome: PipelineOutcome,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            sent_id: dispatch_id.as_str().to_string(),
            to_email_address: recipient.to_string(),
            status: outcome.status_code(),
            time: at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// Outcome encoded in `status`
    pub fn outcome(&self) -> PipelineOutcome {
        PipelineOutcome::from_status_code(self.status)
    }
}

/// Stored audit row, as returned by `GET /audit`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// Row id assigned by the store
    pub id: i64,
    /// Dispatch id returned by the mail backend (may be empty)
    pub sent_id: String,
    /// Student the email was addressed to
    pub to_email_address: String,
    /// 1 when the submission was archived, 0 otherwise
    pub status: i32,
    /// RFC 3339 wall-clock time of the attempt
    pub time: String,
}

/// Result of one pipeline step
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The step completed
    Succeeded,
    /// The step failed; later steps still ran
    Failed {
        /// Rendered error
        error: String,
    },
}

impl StepStatus {
    /// Capture a step's result without consuming it
    pub fn from_result<T, E: fmt::Display>(result: &std::result::Result<T, E>) -> Self {
        match result {
            Ok(_) => StepStatus::Succeeded,
            Err(e) => StepStatus::Failed {
                error: e.to_string(),
            },
        }
    }

    /// Whether the step completed
    pub fn is_success(&self) -> bool {
        matches!(self, StepStatus::Succeeded)
    }
}

/// Everything one pipeline run did
///
/// Returned by [`Pipeline::run`](crate::pipeline::Pipeline::run). The hosting
/// adapter decides whether to log, return, or drop it.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RunReport {
    /// The submission that was processed
    pub event: SubmissionEvent,
    /// Key the content was archived under
    pub archive_key: ArchiveKey,
    /// Final outcome (drives the email template and audit status)
    pub outcome: PipelineOutcome,
    /// Submission download
    pub fetch: StepStatus,
    /// Archive write
    pub archive: StepStatus,
    /// Email dispatch
    pub notify: StepStatus,
    /// Audit insert
    pub audit: StepStatus,
    /// Id returned by the mail backend, if any
    pub dispatch_id: Option<DispatchId>,
    /// Row id of the audit entry, if it was written
    pub audit_record_id: Option<i64>,
    /// Number of bytes handed to the archive writer
    pub archived_bytes: u64,
    /// Hex SHA-256 of the bytes handed to the archive writer
    pub content_sha256: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
}
