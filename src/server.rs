//! JSON HTTP surface over retrieval and patient lookup.
//!
//! A thin transport for callers such as an agent runtime. It holds no
//! session state and runs no model; every request is answered by the same
//! [`Retriever`] and [`PatientRegistry`] the CLI uses.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | `{"status": "ok", "version": ..}` |
//! | `POST` | `/search` | Guideline search, `{ "query": .., "top_n": .. }` |
//! | `GET`  | `/patients/{id}` | Patient record or `{"found": false}` |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Search failures are not errors at this layer: `/search` always answers
//! 200 with the tool payload, which carries its own `error` field.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::patients::PatientRegistry;
use crate::search::{search_guidelines_tool, Retriever};
use crate::store::SqliteStore;

#[derive(Clone)]
pub struct AppState {
    pub retriever: Retriever,
    pub patients: Arc<PatientRegistry>,
}

/// Starts the HTTP server on `[server].bind`. Runs until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = Arc::new(SqliteStore::open(&config.db.path).await?);
    let retriever = Retriever::from_config(config, store)?;
    let patients = match &config.patients.path {
        Some(path) => PatientRegistry::load(path)?,
        None => PatientRegistry::default(),
    };

    let state = AppState {
        retriever,
        patients: Arc::new(patients),
    };

    let bind_addr = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(bind = %bind_addr, "server listening");
    println!("ng12 server listening on http://{}", bind_addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Route table, separated from binding so tests can drive it directly.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/search", post(handle_search))
        .route("/patients/{id}", get(handle_patient))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /search ============

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default)]
    top_n: Option<usize>,
}

async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }
    if req.top_n == Some(0) {
        return Err(bad_request("top_n must be >= 1"));
    }
    Ok(Json(
        search_guidelines_tool(&state.retriever, &req.query, req.top_n).await,
    ))
}

// ============ GET /patients/{id} ============

async fn handle_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<serde_json::Value> {
    Json(state.patients.lookup(&id))
}
