//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the submission-relay
//! REST API using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the submission-relay REST API
///
/// The spec can be accessed via `/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "submission-relay REST API",
        version = "0.1.0",
        description = "Receives submission notifications, runs the fetch/archive/notify/audit pipeline, and exposes the notification audit log",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        // Events
        crate::api::routes::receive_events,

        // Audit
        crate::api::routes::list_audit_records,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(
        schemas(
            // Pipeline types
            crate::pipeline::BatchReport,
            crate::pipeline::RejectedRecord,
            crate::types::RunReport,
            crate::types::StepStatus,
            crate::types::SubmissionEvent,
            crate::types::PipelineOutcome,
            crate::types::ArchiveKey,
            crate::types::DispatchId,

            // Audit types
            crate::types::AuditEntry,
            crate::api::routes::AuditPage,
            crate::api::routes::AuditQuery,

            // Error types
            crate::error::ApiError,
            crate::error::ErrorDetail,
        )
    ),
    tags(
        (name = "events", description = "Submission notifications"),
        (name = "audit", description = "Notification audit log"),
        (name = "system", description = "Health and API documentation")
    )
)]
pub struct ApiDoc;
