//! # HTTP Surface Tests
//!
//! Router-level tests exercising ingestion, point lookup, range replay,
//! validation failures, rate limiting and the publish hook.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    middleware, Router,
};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use strata_core::config::{RateLimitConfig, StoreConfig};
use strata_server::bus::{PublishError, Publisher};
use strata_server::ratelimit::{rate_limit, RateLimiter};
use strata_server::server::{create_router, AppState};
use strata_store::Store;

async fn open_store(dir: &TempDir) -> Arc<Store> {
    let config = StoreConfig {
        data_dir: dir.path().to_path_buf(),
        memtable_max_items: 1_000,
    };
    Arc::new(Store::open(config).await.unwrap())
}

async fn app(dir: &TempDir) -> Router {
    create_router(Arc::new(AppState::new(open_store(dir).await)))
}

fn post_event(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/events")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_ingest_returns_created() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir).await;

    let response = app
        .oneshot(post_event(r#"{"key":"a","ts":1,"value":{"v":1}}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_string(response).await;
    assert_eq!(body, r#"{"ok":true}"#);
}

#[tokio::test]
async fn test_get_round_trips_raw_value() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir).await;

    app.clone()
        .oneshot(post_event(r#"{"key":"a","ts":1,"value":{"v":[1,2,3]}}"#))
        .await
        .unwrap();

    let response = app.oneshot(get("/events/a")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["key"], "a");
    assert_eq!(body["ts"], 1);
    assert_eq!(body["value"], serde_json::json!({"v": [1, 2, 3]}));
}

#[tokio::test]
async fn test_get_unknown_key_is_404() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir).await;

    let response = app.oneshot(get("/events/missing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ingest_rejects_invalid_event() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir).await;

    // Zero timestamp violates the event invariants.
    let response = app
        .clone()
        .oneshot(post_event(r#"{"key":"a","ts":0,"value":{"v":1}}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Broken JSON never reaches the store.
    let response = app.oneshot(post_event("{not json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_replay_streams_ndjson_in_order() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir).await;

    for (key, ts) in [("a", 10), ("b", 20), ("c", 30), ("d", 40)] {
        app.clone()
            .oneshot(post_event(&format!(
                r#"{{"key":"{}","ts":{},"value":{{"n":{}}}}}"#,
                key, ts, ts
            )))
            .await
            .unwrap();
    }

    let response = app.oneshot(get("/events?from=15&to=35")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/x-ndjson"
    );

    let body = body_string(response).await;
    let lines: Vec<serde_json::Value> = body
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["key"], "b");
    assert_eq!(lines[1]["key"], "c");
}

#[tokio::test]
async fn test_replay_validates_range_params() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir).await;

    let response = app.clone().oneshot(get("/events?from=5")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.oneshot(get("/events?from=10&to=5")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_healthz() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir).await;

    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_rate_limiter_rejects_over_burst() {
    let dir = TempDir::new().unwrap();

    let limiter = Arc::new(RateLimiter::new(&RateLimitConfig {
        requests_per_second: 0.0,
        burst: 2,
    }));
    let app = app(&dir)
        .await
        .layer(middleware::from_fn_with_state(limiter, rate_limit));

    for _ in 0..2 {
        let response = app.clone().oneshot(get("/healthz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["retry-after"], "1");
}

struct UnreachableBus;

#[async_trait]
impl Publisher for UnreachableBus {
    async fn publish(&self, _payload: &[u8]) -> Result<(), PublishError> {
        Err("bus unreachable".into())
    }
}

#[tokio::test]
async fn test_publish_failure_flags_header_but_stores_event() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let state = AppState::new(store.clone()).with_publisher(Arc::new(UnreachableBus));
    let app = create_router(Arc::new(state));

    let response = app
        .clone()
        .oneshot(post_event(r#"{"key":"a","ts":1,"value":{"v":1}}"#))
        .await
        .unwrap();

    // The write succeeded; the failed publish only shows up as a header.
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()["x-publish-error"], "bus unreachable");
    assert!(store.get("a").await.unwrap().is_some());
}
