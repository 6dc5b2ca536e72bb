//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`events`]: submission notifications
//! - [`audit`]: notification audit log
//! - [`system`]: health, OpenAPI

use crate::types::AuditEntry;
use serde::{Deserialize, Serialize};

mod audit;
mod events;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use audit::*;
pub use events::*;
pub use system::*;

// ============================================================================
// Query/Response Types (shared across handlers)
// ============================================================================

/// Query parameters for GET /audit
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AuditQuery {
    /// Maximum number of items to return (default: 50)
    pub limit: Option<i64>,
    /// Number of items to skip (default: 0)
    pub offset: Option<i64>,
    /// Filter by outcome: "succeeded" or "failed"
    pub status: Option<String>,
}

/// One page of audit records
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AuditPage {
    /// Records, newest first
    pub items: Vec<AuditEntry>,
    /// Number of records matching the filter
    pub total: i64,
    /// Page size used
    pub limit: usize,
    /// Records skipped
    pub offset: usize,
}
