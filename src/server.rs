//! HTTP server for the ask endpoint.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/cortex/ask` | Answer `{ "question": "..." }` for the tenant in `x-organization-id` |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! The `x-organization-id` header stands in for the authentication
//! middleware a deployment puts in front of this service.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `unauthorized` (401), `internal` (500).
//! Connector and LLM failures are not errors here: they yield a 200 with an
//! explanatory answer.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::answer::AnswerResult;
use crate::config::Config;
use crate::cortex::Cortex;

pub const ORGANIZATION_HEADER: &str = "x-organization-id";

#[derive(Clone)]
struct AppState {
    cortex: Arc<Cortex>,
}

/// Bind `[server].bind` and serve until the process is terminated.
pub async fn run_server(config: &Config, cortex: Arc<Cortex>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = build_router(cortex);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "cortex server listening");
    println!("Cortex server listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// The application router, without a listener. Used by `run_server` and
/// by tests that bind an ephemeral port.
pub fn build_router(cortex: Arc<Cortex>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/cortex/ask", post(handle_ask))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { cortex })
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

fn unauthorized(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::UNAUTHORIZED,
        code: "unauthorized".to_string(),
        message: message.into(),
    }
}

/// Only grounder defects reach this; the detail stays in the log.
fn internal(err: anyhow::Error) -> AppError {
    tracing::error!(error = %err, "ask failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: "internal error while answering the question".to_string(),
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

// ============ POST /api/cortex/ask ============

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

async fn handle_ask(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AnswerResult>, AppError> {
    let organization_id = headers
        .get(ORGANIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| unauthorized(format!("missing {} header", ORGANIZATION_HEADER)))?
        .to_string();

    let Json(request) = body.map_err(|e| bad_request(e.body_text()))?;
    if request.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    let result = state
        .cortex
        .answer_question(&request.question, &organization_id)
        .await
        .map_err(internal)?;

    Ok(Json(result))
}
