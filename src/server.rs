//! HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/advice` | Answer `{ "userScenario": "..." }` with `{ "advice": "..." }` |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Status codes
//!
//! Every response to `/api/advice`, including failures, carries an
//! `advice` string meant for display:
//!
//! | Status | When |
//! |--------|------|
//! | 200 | answered, or no filing content available |
//! | 400 | empty question |
//! | 413 | body larger than `server.max_body_bytes` |
//! | 500 | missing API key, or any failure inside the pipeline |
//!
//! Internal error details are logged, never returned.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::pipeline::{AdviceError, Advisor, Outcome};

pub const EMPTY_QUESTION_ADVICE: &str = "Please enter a question about the filings.";
pub const NO_CONTENT_ADVICE: &str = "I couldn't find any filing content to answer from. \
Please check that the filings data is available and try again.";
pub const TOO_LARGE_ADVICE: &str =
    "Your request was too large. Please shorten your question and try again.";
pub const UNEXPECTED_ADVICE: &str =
    "Something went wrong while preparing your answer. Please try again later.";

pub fn configuration_advice(env_var: &str) -> String {
    format!("The advisor is not configured: set the {env_var} environment variable with a valid API key.")
}

/// Starts the HTTP server using the configured CSV and completion API.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let advisor = Arc::new(Advisor::from_config(config)?);
    run_server_with_advisor(&config.server.bind, advisor).await
}

/// Starts the HTTP server around a prebuilt [`Advisor`].
pub async fn run_server_with_advisor(bind_addr: &str, advisor: Arc<Advisor>) -> anyhow::Result<()> {
    let app = router(advisor);

    tracing::info!("advice server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(advisor: Arc<Advisor>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = DefaultBodyLimit::max(advisor.config().server.max_body_bytes);

    Router::new()
        .route("/api/advice", post(handle_advice).layer(body_limit))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(advisor)
}

// ============ Responses ============

#[derive(Debug, Serialize)]
struct AdviceResponse {
    advice: String,
}

/// A status code plus display text, rendered as `{ "advice": ... }`.
struct AdviceReply {
    status: StatusCode,
    advice: String,
}

impl IntoResponse for AdviceReply {
    fn into_response(self) -> Response {
        (self.status, Json(AdviceResponse { advice: self.advice })).into_response()
    }
}

fn reply(status: StatusCode, advice: impl Into<String>) -> AdviceReply {
    AdviceReply {
        status,
        advice: advice.into(),
    }
}

impl From<AdviceError> for AdviceReply {
    fn from(err: AdviceError) -> Self {
        match err {
            AdviceError::Configuration(var) => {
                tracing::error!(env = %var, "advice request rejected: missing configuration");
                reply(StatusCode::INTERNAL_SERVER_ERROR, configuration_advice(&var))
            }
            AdviceError::Unexpected(e) => {
                tracing::error!("advice request failed: {:#}", e);
                reply(StatusCode::INTERNAL_SERVER_ERROR, UNEXPECTED_ADVICE)
            }
        }
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

// ============ POST /api/advice ============

#[derive(Debug, Deserialize)]
struct AdviceRequest {
    #[serde(rename = "userScenario", default)]
    user_scenario: Option<String>,
}

/// Handler for `POST /api/advice`.
///
/// The body is parsed leniently: invalid JSON or a missing `userScenario`
/// is treated as an empty question. Only an oversized body is rejected.
async fn handle_advice(
    State(advisor): State<Arc<Advisor>>,
    body: Result<Bytes, BytesRejection>,
) -> AdviceReply {
    let body = match body {
        Ok(body) => body,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            tracing::info!("advice request rejected: {}", rejection.body_text());
            return reply(StatusCode::PAYLOAD_TOO_LARGE, TOO_LARGE_ADVICE);
        }
        Err(rejection) => {
            tracing::debug!("unreadable advice body: {}", rejection.body_text());
            Bytes::new()
        }
    };

    let question = serde_json::from_slice::<AdviceRequest>(&body)
        .ok()
        .and_then(|r| r.user_scenario)
        .unwrap_or_default();

    match advisor.advise(&question).await {
        Ok(Outcome::Answered { advice, sources }) => {
            tracing::info!(sources = ?sources, "advice answered");
            reply(StatusCode::OK, advice)
        }
        Ok(Outcome::EmptyQuestion) => reply(StatusCode::BAD_REQUEST, EMPTY_QUESTION_ADVICE),
        Ok(Outcome::NoCandidates) => reply(StatusCode::OK, NO_CONTENT_ADVICE),
        Err(e) => e.into(),
    }
}
