// src/api.rs
//! Read-only HTTP surface over the published snapshot.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::ingest::scheduler::RefreshTrigger;
use crate::ingest::types::{SourceKind, TransferRecord};
use crate::store::SnapshotStore;

/// Name of the derived cross-source view in `/api/transfers/{source}`.
pub const ALL_SOURCES: &str = "all";

#[derive(Clone)]
pub struct AppState {
    pub store: SnapshotStore,
    /// Absent when no scheduler is running (e.g. in router tests).
    pub refresh: Option<RefreshTrigger>,
}

impl AppState {
    pub fn new(store: SnapshotStore, refresh: Option<RefreshTrigger>) -> Self {
        Self { store, refresh }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/transfers", get(all_transfers))
        .route("/api/transfers/{source}", get(source_transfers))
        .route("/api/refresh", post(request_refresh))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn all_transfers(State(state): State<AppState>) -> Response {
    let snap = state.store.current();
    Json(&*snap).into_response()
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceOut {
    source: String,
    data: Vec<TransferRecord>,
    last_updated: Option<DateTime<Utc>>,
}

async fn source_transfers(
    State(state): State<AppState>,
    Path(source): Path<String>,
) -> Response {
    let snap = state.store.current();
    let wanted = source.trim().to_ascii_lowercase();

    let data = if wanted == ALL_SOURCES {
        snap.all_sources()
    } else {
        match wanted.parse::<SourceKind>() {
            Ok(kind) => snap.records(kind).to_vec(),
            Err(_) => {
                return (
                    StatusCode::NOT_FOUND,
                    Json(json!({ "error": "Source not found" })),
                )
                    .into_response();
            }
        }
    };

    Json(SourceOut {
        source: wanted,
        data,
        last_updated: snap.last_updated(),
    })
    .into_response()
}

async fn request_refresh(State(state): State<AppState>) -> Response {
    match &state.refresh {
        Some(trigger) => {
            trigger.request();
            (StatusCode::ACCEPTED, Json(json!({ "status": "scheduled" }))).into_response()
        }
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "Refresh scheduler not running" })),
        )
            .into_response(),
    }
}
