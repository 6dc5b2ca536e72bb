//! Audit recording of notification attempts
//!
//! One append-only entry per pipeline run. The entry carries the outcome the
//! student was told about, not whether the email actually went out; a failed
//! dispatch shows up as an empty `sent_id`.

use crate::db::Database;
use crate::types::{DispatchId, DispatchRecord, PipelineOutcome};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Trait for the append-only audit store
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Insert one record and return its id
    async fn append(&self, record: &DispatchRecord) -> Result<i64>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

#[async_trait]
impl AuditLog for Database {
    async fn append(&self, record: &DispatchRecord) -> Result<i64> {
        self.insert_dispatch_record(record).await
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

/// Builds dispatch records and hands them to an [`AuditLog`]
#[derive(Clone)]
pub struct AuditRecorder {
    log: Arc<dyn AuditLog>,
}

impl AuditRecorder {
    /// Create a recorder writing to `log`
    pub fn new(log: Arc<dyn AuditLog>) -> Self {
        Self { log }
    }

    /// Record one notification attempt
    ///
    /// Exactly one insert is attempted; no retry on failure.
    pub async fn record(
        &self,
        dispatch_id: &DispatchId,
        recipient: &str,
        outcome: PipelineOutcome,
        at: DateTime<Utc>,
    ) -> Result<i64> {
        let record = DispatchRecord::new(dispatch_id, recipient, outcome, at);
        let id = self.log.append(&record).await?;

        tracing::debug!(
            id,
            log = self.log.name(),
            sent_id = %record.sent_id,
            status = record.status,
            "audit record written"
        );

        Ok(id)
    }
}

impl std::fmt::Debug for AuditRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditRecorder")
            .field("log", &self.log.name())
            .finish()
    }
}
