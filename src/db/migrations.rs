//! Database lifecycle and schema migrations.

use crate::error::DatabaseError;
use crate::{Error, Result};
use sqlx::SqliteConnection;
use sqlx::sqlite::SqlitePool;
use std::path::Path;

use super::{Database, validate_table_name};

impl Database {
    /// Create a new database connection
    ///
    /// Creates the database file if it doesn't exist and runs the migrations
    /// for `table_name`. Several audit tables may share one file; each keeps
    /// its own schema version.
    pub async fn new(path: &Path, table_name: &str) -> Result<Self> {
        validate_table_name(table_name)?;

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to create database directory: {}",
                    e
                )))
            })?;
        }

        use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
        use std::str::FromStr;

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to parse database path: {}",
                    e
                )))
            })?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePool::connect_with(options).await.map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "Failed to connect to database: {}",
                e
            )))
        })?;

        let db = Self {
            pool,
            table: table_name.to_string(),
        };

        db.run_migrations().await?;

        Ok(db)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "Failed to acquire connection: {}",
                e
            )))
        })?;

        // Create schema version table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                table_name TEXT NOT NULL,
                version INTEGER NOT NULL,
                applied_at INTEGER NOT NULL,
                PRIMARY KEY (table_name, version)
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::MigrationFailed(format!(
                "Failed to create schema_version table: {}",
                e
            )))
        })?;

        let current_version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM schema_version WHERE table_name = ?")
                .bind(&self.table)
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to query schema version: {}",
                        e
                    )))
                })?
                .flatten();

        let current_version = current_version.unwrap_or(0);

        if current_version < 1 {
            self.migrate_v1(&mut conn).await?;
        }
        if current_version < 2 {
            self.migrate_v2(&mut conn).await?;
        }

        Ok(())
    }

    /// Run `steps` inside a transaction and record `version` on success
    async fn apply_migration(
        &self,
        conn: &mut SqliteConnection,
        version: i32,
        steps: &[(&str, String)],
    ) -> Result<()> {
        tracing::info!(table = %self.table, version, "Applying database migration");

        // Wrap migration in a transaction so partial failures don't leave the DB in a broken state
        sqlx::query("BEGIN")
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::MigrationFailed(format!(
                    "Failed to begin transaction: {}",
                    e
                )))
            })?;

        let result = async {
            for (what, statement) in steps {
                sqlx::query(statement)
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| {
                        Error::Database(DatabaseError::MigrationFailed(format!(
                            "Failed to {}: {}",
                            what, e
                        )))
                    })?;
            }
            self.record_migration(conn, version).await?;
            Ok::<(), Error>(())
        }
        .await;

        match result {
            Ok(()) => {
                sqlx::query("COMMIT")
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| {
                        Error::Database(DatabaseError::MigrationFailed(format!(
                            "Failed to commit migration v{}: {}",
                            version, e
                        )))
                    })?;
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                return Err(e);
            }
        }

        tracing::info!(table = %self.table, version, "Database migration complete");
        Ok(())
    }

    /// Migration v1: create the audit table
    async fn migrate_v1(&self, conn: &mut SqliteConnection) -> Result<()> {
        let create_table = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sent_id TEXT NOT NULL,
                to_email_address TEXT NOT NULL,
                status INTEGER NOT NULL,
                time TEXT NOT NULL
            )
            "#,
            self.quoted_table()
        );

        self.apply_migration(conn, 1, &[("create audit table", create_table)])
            .await
    }

    /// Migration v2: indexes for the operator queries
    async fn migrate_v2(&self, conn: &mut SqliteConnection) -> Result<()> {
        let status_index = format!(
            "CREATE INDEX IF NOT EXISTS \"idx_{}_status\" ON {}(status)",
            self.table,
            self.quoted_table()
        );
        let recipient_index = format!(
            "CREATE INDEX IF NOT EXISTS \"idx_{}_recipient\" ON {}(to_email_address)",
            self.table,
            self.quoted_table()
        );

        self.apply_migration(
            conn,
            2,
            &[
                ("create status index", status_index),
                ("create recipient index", recipient_index),
            ],
        )
        .await
    }

    /// Record a migration as applied
    async fn record_migration(&self, conn: &mut SqliteConnection, version: i32) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query("INSERT INTO schema_version (table_name, version, applied_at) VALUES (?, ?, ?)")
            .bind(&self.table)
            .bind(version)
            .bind(now)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::MigrationFailed(format!(
                    "Failed to record migration: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Close the connection pool
    ///
    /// Every later query fails with a database error instead of reopening
    /// the file.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
