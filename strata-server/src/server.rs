//! # HTTP Server Implementation
//!
//! REST surface over the store:
//!
//! - `POST /events`          ingest one event, 201 on success
//! - `GET  /events/:key`     point lookup
//! - `GET  /events?from=&to=` range replay, streamed as NDJSON
//! - `GET  /healthz`         liveness probe
//!
//! Event values travel as raw JSON and are preserved byte-for-byte between
//! ingestion and queries.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use tracing::warn;

use strata_core::Event;
use strata_store::Store;

use crate::bus::Publisher;

// ========== API Types ==========

/// Wire format of an event. `value` is arbitrary JSON carried through
/// untouched.
#[derive(Debug, Serialize, Deserialize)]
pub struct EventDto {
    pub key: String,
    pub ts: i64,
    pub value: Box<RawValue>,
}

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

pub fn dto_to_event(dto: &EventDto) -> Event {
    Event::new(dto.key.clone(), dto.ts, dto.value.get().as_bytes().to_vec())
}

pub fn event_to_dto(event: &Event) -> serde_json::Result<EventDto> {
    Ok(EventDto {
        key: event.key.clone(),
        ts: event.ts,
        value: value_to_raw(&event.value)?,
    })
}

/// Stored values are JSON by convention; anything else is shipped as a JSON
/// string so responses stay well-formed.
fn value_to_raw(value: &[u8]) -> serde_json::Result<Box<RawValue>> {
    if let Some(raw) = std::str::from_utf8(value)
        .ok()
        .and_then(|text| RawValue::from_string(text.to_owned()).ok())
    {
        return Ok(raw);
    }
    RawValue::from_string(serde_json::to_string(&String::from_utf8_lossy(value))?)
}

// ========== Server State ==========

pub struct AppState {
    pub store: Arc<Store>,
    /// Optional bus hook; a publish failure never fails the request.
    pub publisher: Option<Arc<dyn Publisher>>,
}

impl AppState {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            publisher: None,
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }
}

// ========== Routes ==========

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/events", post(ingest_event).get(replay_events))
        .route("/events/:key", get(get_event))
        .route("/healthz", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn ingest_event(
    State(state): State<Arc<AppState>>,
    Json(dto): Json<EventDto>,
) -> Response {
    let event = dto_to_event(&dto);

    match state.store.put(event).await {
        Ok(()) => {}
        Err(e) if e.is_caller_error() => {
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }

    let mut response =
        (StatusCode::CREATED, Json(serde_json::json!({ "ok": true }))).into_response();

    // Republish the original payload after a successful put. The write is
    // already durable, so a failed publish only gets flagged in a header.
    if let Some(publisher) = &state.publisher {
        if let Ok(payload) = serde_json::to_vec(&dto) {
            if let Err(e) = publisher.publish(&payload).await {
                warn!(error = %e, "publish after put failed");
                let value = HeaderValue::from_str(&e.to_string())
                    .unwrap_or_else(|_| HeaderValue::from_static("publish failed"));
                response.headers_mut().insert("x-publish-error", value);
            }
        }
    }

    response
}

async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Response {
    match state.store.get(&key).await {
        Ok(Some(event)) => match event_to_dto(&event) {
            Ok(dto) => Json(dto).into_response(),
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        },
        Ok(None) => (StatusCode::NOT_FOUND, "not found").into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn replay_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeParams>,
) -> Response {
    let (Some(from), Some(to)) = (params.from, params.to) else {
        return (StatusCode::BAD_REQUEST, "from and to are required").into_response();
    };

    let mut rx = match state.store.replay(from, to).await {
        Ok(rx) => rx,
        Err(e) if e.is_caller_error() => {
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };

    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            let line = event_to_dto(&event)
                .and_then(|dto| serde_json::to_string(&dto));
            match line {
                Ok(mut line) => {
                    line.push('\n');
                    yield Ok::<_, Infallible>(Bytes::from(line));
                }
                Err(e) => warn!(key = %event.key, error = %e, "dropping unencodable event from replay"),
            }
        }
    };

    (
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(stream),
    )
        .into_response()
}
