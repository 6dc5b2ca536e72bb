//! REST API server module
//!
//! Hosts the pipeline behind HTTP: SNS deliveries are posted to `/events`,
//! operators read the notification audit log from `/audit`.

use crate::Result;
use axum::{
    Router,
    routing::{get, post},
};
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Events
/// - `POST /events` - Run the pipeline for an SNS notification envelope
///
/// ## Audit
/// - `GET /audit` - List audit records (with pagination and status filter)
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Events
        .route("/events", post(routes::receive_events))
        // Audit
        .route("/audit", get(routes::list_audit_records))
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the API server on `bind_address`.
///
/// Serves until `shutdown` resolves, then stops accepting connections and
/// waits for in-flight requests (and the pipeline runs they drive) to finish.
///
/// # Example
///
/// ```no_run
/// use submission_relay::{Config, Database, Pipeline};
/// use submission_relay::api::{AppState, start_api_server};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::from_env()?;
/// let db = Arc::new(Database::new(&config.audit.database_path, &config.audit.table_name).await?);
/// let pipeline = Arc::new(Pipeline::from_config(&config, db.clone()));
///
/// start_api_server(
///     AppState::new(pipeline, db),
///     config.server.bind_address,
///     async { tokio::signal::ctrl_c().await.ok(); },
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server<F>(state: AppState, bind_address: SocketAddr, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::info!(
        address = %bind_address,
        "Starting API server"
    );

    let app = create_router(state);

    // Bind TCP listener to the configured address
    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %listener.local_addr().unwrap_or(bind_address),
        "API server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
