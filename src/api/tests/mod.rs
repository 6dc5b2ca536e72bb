use super::*;
use crate::db::Database;
use crate::pipeline::test_helpers::{Harness, default_harness};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tower::ServiceExt; // for oneshot()


/// Router over the in-memory pipeline fakes and a real audit database.
/// Returns the tempdir too, which must be kept alive.
async fn create_test_app() -> (Router, Harness, Arc<Database>, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let db = Arc::new(
        Database::new(&temp_dir.path().join("audit.db"), "email_tracking")
            .await
            .unwrap(),
    );
    let harness = default_harness();
    let state = AppState::new(Arc::new(harness.pipeline.clone()), db.clone());
    (create_router(state), harness, db, temp_dir)
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (app, _harness, _db, _temp_dir) = create_test_app().await;

    let response = app.oneshot(get("/downloads")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_server_serves_until_shutdown() {
    let (_app, harness, db, _temp_dir) = create_test_app().await;
    let state = AppState::new(Arc::new(harness.pipeline.clone()), db);
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    // Port 0 = OS assigns a free port
    let server = tokio::spawn(start_api_server(
        state,
        "127.0.0.1:0".parse().unwrap(),
        async move {
            rx.await.ok();
        },
    ));

    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server should stop after shutdown signal")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_bind_failure_is_reported() {
    let (_app, harness, db, _temp_dir) = create_test_app().await;
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = occupied.local_addr().unwrap();

    let result = start_api_server(
        AppState::new(Arc::new(harness.pipeline.clone()), db),
        address,
        async {},
    )
    .await;

    assert!(matches!(result, Err(crate::Error::Io(_))));
}
