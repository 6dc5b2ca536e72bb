//! Database layer for submission-relay
//!
//! Handles SQLite persistence for the notification audit log.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`]: database lifecycle, schema migrations
//! - [`audit`]: append-only dispatch records and their read-side queries
//!
//! The audit table name comes from configuration. It is checked to be a plain
//! SQL identifier before the database is opened and is always quoted when
//! interpolated into a statement.

use crate::error::DatabaseError;
use crate::types::AuditEntry;
use crate::{Error, Result};
use sqlx::{FromRow, sqlite::SqlitePool};

mod audit;
mod migrations;

const MAX_TABLE_NAME_LEN: usize = 64;

/// Audit record from database (raw from SQLite)
#[derive(Debug, Clone, FromRow)]
pub struct AuditRow {
    /// Unique database ID
    pub id: i64,
    /// Dispatch id returned by the mail backend (may be empty)
    pub sent_id: String,
    /// Recipient of the notification
    pub to_email_address: String,
    /// 1 = submission archived, 0 = failed
    pub status: i32,
    /// RFC 3339 time of the attempt
    pub time: String,
}

impl From<AuditRow> for AuditEntry {
    fn from(row: AuditRow) -> Self {
        AuditEntry {
            id: row.id,
            sent_id: row.sent_id,
            to_email_address: row.to_email_address,
            status: row.status,
            time: row.time,
        }
    }
}

/// Database handle for submission-relay
pub struct Database {
    pool: SqlitePool,
    table: String,
}

impl Database {
    /// Name of the audit table this handle writes to
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Audit table name, quoted for interpolation into SQL
    fn quoted_table(&self) -> String {
        format!("\"{}\"", self.table)
    }
}

/// Check that `name` can be used as an unquoted SQL identifier
pub fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest && name.len() <= MAX_TABLE_NAME_LEN && !name.starts_with("sqlite_")
    {
        Ok(())
    } else {
        Err(Error::Database(DatabaseError::InvalidTableName(
            name.to_string(),
        )))
    }
}
