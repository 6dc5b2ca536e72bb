//! Submission notification handler.

use crate::api::AppState;
use crate::pipeline::BatchReport;
use crate::Result;
use axum::{Json, body::Bytes, extract::State};

/// POST /events - Run the pipeline for a notification envelope
///
/// Accepts an SNS event batch or a single SNS HTTP notification. The body is
/// read as raw bytes, so the `text/plain` content type SNS uses is accepted.
#[utoipa::path(
    post,
    path = "/events",
    tag = "events",
    request_body(
        content = String,
        description = "SNS envelope whose Message is a submission JSON document",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Every decoded record was run", body = BatchReport),
        (status = 400, description = "Payload is not a notification envelope", body = crate::error::ApiError),
        (status = 422, description = "Envelope is not a notification", body = crate::error::ApiError)
    )
)]
pub async fn receive_events(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<BatchReport>> {
    let batch = state.pipeline.handle_payload(&body).await?;

    tracing::info!(
        runs = batch.runs.len(),
        failed = batch.runs.iter().filter(|run| !run.outcome.is_success()).count(),
        rejected = batch.rejected.len(),
        "notification handled"
    );

    Ok(Json(batch))
}
