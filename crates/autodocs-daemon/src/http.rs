//! HTTP API over the served page index.

use autodocs_core::{RepoSync, SyncPhase};
use autodocs_index::PageStore;
use axum::extract::{Path, State};
use axum::http::{header, HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub name: String,
    pub store: PageStore,
    pub sync: Arc<RepoSync>,
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::OPTIONS,
            Method::HEAD,
            Method::DELETE,
        ])
        .allow_headers([
            header::ORIGIN,
            HeaderName::from_static("x-client"),
            header::CONTENT_TYPE,
            header::CONNECTION,
        ]);

    Router::new()
        .route("/_api/pages", get(list_pages))
        .route("/_api/page/*path", get(get_page))
        .route("/_api/status", get(status))
        .route("/_health", get(health))
        .with_state(state)
        .layer(cors)
}

async fn list_pages(State(state): State<AppState>) -> Response {
    let index = state.store.current();
    Json(index.snapshot()).into_response()
}

async fn get_page(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    let logical_path = format!("/{}", path.trim_start_matches('/'));

    match state.store.get_page(&logical_path) {
        Some(page) => Json(page).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Path not found" })),
        )
            .into_response(),
    }
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    name: String,
    uri: String,
    branch: String,
    phase: &'static str,
    revision: Option<String>,
    last_polled: Option<DateTime<Utc>>,
    last_error: Option<String>,
    generation: u64,
    pages: usize,
    built_at: DateTime<Utc>,
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let repo = state.sync.state();
    let index = state.store.current();

    Json(StatusResponse {
        name: state.name.clone(),
        uri: repo.remote.uri,
        branch: repo.remote.branch,
        phase: match repo.phase {
            SyncPhase::Uninitialized => "uninitialized",
            SyncPhase::Tracking => "tracking",
        },
        revision: repo.current_revision.map(|rev| rev.to_string()),
        last_polled: repo.last_polled,
        last_error: repo.last_error,
        generation: state.store.generation(),
        pages: index.len(),
        built_at: index.built_at(),
    })
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
