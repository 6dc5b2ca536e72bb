//! # submission-relay
//!
//! Event-triggered pipeline for assignment submissions.
//!
//! Each submission notification drives four steps in order:
//! - **Fetch** the submitted file from its URL
//! - **Archive** whatever bytes arrived under a deterministic key
//! - **Notify** the student with a success or failure email
//! - **Audit** the notification attempt in an append-only log
//!
//! Every step runs regardless of earlier failures. Only fetch and archive
//! failures decide the outcome the student is told about; notify and audit
//! failures are logged and reported.
//!
//! ## Quick Start
//!
//! ```no_run
//! use submission_relay::{Config, Database, Pipeline};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let db = Arc::new(Database::new(&config.audit.database_path, &config.audit.table_name).await?);
//!     let pipeline = Pipeline::from_config(&config, db);
//!
//!     let payload = std::fs::read("event.json")?;
//!     let report = pipeline.handle_payload(&payload).await?;
//!     for run in &report.runs {
//!         println!("{}: {}", run.event.student_email, run.outcome);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Archive stores (object storage and local directory)
pub mod archive;
/// Audit log seam
pub mod audit;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Submission download
pub mod fetch;
/// Outcome emails
pub mod notify;
/// Pipeline orchestration
pub mod pipeline;
/// Trigger envelope decoding
pub mod trigger;
/// Core types
pub mod types;

// Re-export commonly used types
pub use archive::{ArchiveReceipt, ArchiveStore};
pub use audit::{AuditLog, AuditRecorder};
pub use config::Config;
pub use db::Database;
pub use error::{
    ApiError, ArchiveError, DatabaseError, DecodeError, DispatchError, Error, ErrorDetail,
    FetchError, Result, ToHttpStatus,
};
pub use fetch::SubmissionFetcher;
pub use notify::{Mailer, NotificationDispatcher};
pub use pipeline::{BatchReport, Pipeline, RejectedRecord};
pub use types::{
    ArchiveKey, AuditEntry, DispatchId, DispatchRecord, PipelineOutcome, RunReport, StepStatus,
    SubmissionEvent,
};

use std::sync::Arc;

/// Serve the REST adapter until a termination signal arrives.
///
/// Opens the audit database, builds the production pipeline from `config`
/// and serves it on `config.server.bind_address`. In-flight runs finish
/// before the database is closed.
///
/// Stops on SIGINT (Ctrl+C) and, on unix, SIGTERM.
///
/// # Example
///
/// ```no_run
/// use submission_relay::{Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::from_env()?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(config).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(config: Config) -> Result<()> {
    let db = Arc::new(Database::new(&config.audit.database_path, &config.audit.table_name).await?);
    let pipeline = Arc::new(Pipeline::from_config(&config, db.clone()));
    tracing::debug!(?pipeline, "pipeline ready");

    let served = api::start_api_server(
        api::AppState::new(pipeline, db.clone()),
        config.server.bind_address,
        shutdown_signal(),
    )
    .await;

    db.close().await;
    served
}

/// Future that resolves on the first SIGINT (Ctrl+C) or, on unix, SIGTERM.
///
/// The SIGTERM handler is installed when this is called, not when the future
/// is first polled, so a signal arriving while the server starts up is not
/// lost. A handler that cannot be installed is logged and never fires.
fn shutdown_signal() -> impl Future<Output = ()> + Send + 'static {
    #[cfg(unix)]
    let terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .inspect_err(|e| tracing::warn!(error = %e, "Could not register SIGTERM handler"))
        .ok();

    async move {
        let interrupt = async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Received SIGINT signal (Ctrl+C)"),
                Err(e) => {
                    tracing::warn!(error = %e, "Could not listen for Ctrl+C");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(unix)]
        let terminate = async move {
            match terminate {
                Some(mut sigterm) => {
                    sigterm.recv().await;
                    tracing::info!("Received SIGTERM signal");
                }
                None => std::future::pending::<()>().await,
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = interrupt => {}
            _ = terminate => {}
        }
    }
}
