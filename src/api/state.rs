//! Application state for the API server

use crate::db::Database;
use crate::pipeline::Pipeline;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap Arc clone) and provides
/// access to the pipeline and the audit database.
#[derive(Clone)]
pub struct AppState {
    /// Pipeline that runs submitted events
    pub pipeline: Arc<Pipeline>,

    /// Audit database (read-side queries)
    pub db: Arc<Database>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(pipeline: Arc<Pipeline>, db: Arc<Database>) -> Self {
        Self { pipeline, db }
    }
}
