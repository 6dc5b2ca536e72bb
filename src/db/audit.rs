//! Audit log operations.

use crate::types::{AuditEntry, DispatchRecord};
use crate::{Error, Result};

use super::{AuditRow, Database};

impl Database {
    /// Append a dispatch record
    ///
    /// Every call inserts a new row, so running the same submission twice
    /// leaves two records. Returns the row id.
    pub async fn insert_dispatch_record(&self, record: &DispatchRecord) -> Result<i64> {
        let statement = format!(
            "INSERT INTO {} (sent_id, to_email_address, status, time) VALUES (?, ?, ?, ?)",
            self.quoted_table()
        );

        let result = sqlx::query(&statement)
            .bind(&record.sent_id)
            .bind(&record.to_email_address)
            .bind(record.status)
            .bind(&record.time)
            .execute(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        Ok(result.last_insert_rowid())
    }

    /// Query dispatch records with pagination and optional status filter
    ///
    /// Returns records newest first.
    pub async fn list_dispatch_records(
        &self,
        status_filter: Option<i32>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<AuditEntry>> {
        let rows = if let Some(status) = status_filter {
            let statement = format!(
                r#"
                SELECT id, sent_id, to_email_address, status, time
                FROM {}
                WHERE status = ?
                ORDER BY id DESC
                LIMIT ? OFFSET ?
                "#,
                self.quoted_table()
            );
            sqlx::query_as::<_, AuditRow>(&statement)
                .bind(status)
                .bind(limit as i64)
                .bind(offset as i64)
                .fetch_all(&self.pool)
                .await
                .map_err(Error::Sqlx)?
        } else {
            let statement = format!(
                r#"
                SELECT id, sent_id, to_email_address, status, time
                FROM {}
                ORDER BY id DESC
                LIMIT ? OFFSET ?
                "#,
                self.quoted_table()
            );
            sqlx::query_as::<_, AuditRow>(&statement)
                .bind(limit as i64)
                .bind(offset as i64)
                .fetch_all(&self.pool)
                .await
                .map_err(Error::Sqlx)?
        };

        Ok(rows.into_iter().map(AuditEntry::from).collect())
    }

    /// Count dispatch records (optionally filtered by status)
    pub async fn count_dispatch_records(&self, status_filter: Option<i32>) -> Result<i64> {
        let count = if let Some(status) = status_filter {
            let statement = format!("SELECT COUNT(*) FROM {} WHERE status = ?", self.quoted_table());
            sqlx::query_scalar::<_, i64>(&statement)
                .bind(status)
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Sqlx)?
        } else {
            let statement = format!("SELECT COUNT(*) FROM {}", self.quoted_table());
            sqlx::query_scalar::<_, i64>(&statement)
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Sqlx)?
        };

        Ok(count)
    }

    /// Get a single dispatch record by ID
    pub async fn get_dispatch_record(&self, id: i64) -> Result<Option<AuditEntry>> {
        let statement = format!(
            "SELECT id, sent_id, to_email_address, status, time FROM {} WHERE id = ?",
            self.quoted_table()
        );
        let row = sqlx::query_as::<_, AuditRow>(&statement)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        Ok(row.map(AuditEntry::from))
    }
}
