//! Audit log handlers.

use super::{AuditPage, AuditQuery};
use crate::api::AppState;
use crate::error::ApiError;
use crate::types::PipelineOutcome;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// GET /audit - List notification audit records (with pagination)
#[utoipa::path(
    get,
    path = "/audit",
    tag = "audit",
    params(
        ("limit" = Option<i64>, Query, description = "Maximum number of items to return"),
        ("offset" = Option<i64>, Query, description = "Number of items to skip"),
        ("status" = Option<String>, Query, description = "Filter by outcome (succeeded/failed)")
    ),
    responses(
        (status = 200, description = "Audit records, newest first", body = AuditPage),
        (status = 400, description = "Invalid query parameters", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn list_audit_records(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(50).clamp(1, 1000) as usize;
    let offset = query.offset.unwrap_or(0).max(0) as usize;

    let status_filter = match query.status.as_deref().map(str::to_lowercase).as_deref() {
        None => None,
        Some("succeeded") => Some(PipelineOutcome::Succeeded.status_code()),
        Some("failed") => Some(PipelineOutcome::Failed.status_code()),
        Some(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiError::new(
                    "invalid_status",
                    "Invalid status filter. Must be 'succeeded' or 'failed'",
                )),
            )
                .into_response();
        }
    };

    let items = match state
        .db
        .list_dispatch_records(status_filter, limit, offset)
        .await
    {
        Ok(items) => items,
        Err(e) => {
            tracing::error!(error = %e, "Failed to query audit records");
            return e.into_response();
        }
    };

    match state.db.count_dispatch_records(status_filter).await {
        Ok(total) => (
            StatusCode::OK,
            Json(AuditPage {
                items,
                total,
                limit,
                offset,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to count audit records");
            e.into_response()
        }
    }
}
