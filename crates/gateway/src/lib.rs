//! HTTP API gateway for the EduPolicy agent.
//!
//! Endpoints:
//!
//! - `GET    /health`          — liveness probe
//! - `POST   /chat`            — run one agent turn for a session
//! - `POST   /rag/query`       — query the regulation index directly
//! - `POST   /sql/query`       — ask the student-records database directly
//! - `POST   /web/query`       — search the web directly
//! - `GET    /sessions/{id}`   — stored turns of a session
//! - `DELETE /sessions/{id}`   — clear a session
//!
//! Built on Axum. Every response body is JSON; failures carry
//! `{error, kind}` so clients can tell a backend outage from bad input.

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use edupolicy_agent::{AgentController, AgentError, ChatResponse};
use edupolicy_core::session::Turn;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub controller: Arc<AgentController>,
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
///
/// CORS is permissive: the chat UI is served from a different origin.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/chat", post(chat_handler))
        .route("/rag/query", post(rag_query_handler))
        .route("/sql/query", post(sql_query_handler))
        .route("/web/query", post(web_query_handler))
        .route(
            "/sessions/{id}",
            get(session_history_handler).delete(session_reset_handler),
        )
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve an already-built controller on `addr`.
pub async fn serve(controller: Arc<AgentController>, addr: &str) -> std::io::Result<()> {
    let app = build_router(Arc::new(GatewayState { controller }));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Gateway listening");
    axum::serve(listener, app).await
}

// --- Errors ---

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn invalid(field: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse {
                error: format!("`{field}` must not be empty"),
                kind: "invalid_request".into(),
            },
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(e: AgentError) -> Self {
        error!(error = %e, kind = e.kind(), "Request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorResponse {
                error: e.to_string(),
                kind: e.kind().into(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Reject blank fields. The value itself is passed on unchanged.
fn require<'a>(field: &str, value: &'a str) -> Result<&'a str, ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::invalid(field));
    }
    Ok(value)
}

// --- Request / response bodies ---

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RagQueryRequest {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SqlQueryRequest {
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebQueryRequest {
    pub query: String,
    #[serde(default)]
    pub max_results: Option<usize>,
}

/// Body of every direct tool endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ToolResponse {
    pub result: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionHistoryResponse {
    pub session_id: String,
    pub turns: Vec<Turn>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResetResponse {
    pub session_id: String,
    pub reset: bool,
}

// --- Handlers ---

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let session_id = require("session_id", &payload.session_id)?;
    let message = require("message", &payload.message)?;
    info!(session_id, "POST /chat");

    let response = state.controller.chat(session_id, message).await?;
    Ok(Json(response))
}

async fn rag_query_handler(
    State(state): State<SharedState>,
    Json(payload): Json<RagQueryRequest>,
) -> Result<Json<ToolResponse>, ApiError> {
    let query = require("query", &payload.query)?;
    let answer = state.controller.rag_query(query, payload.top_k).await;
    Ok(Json(ToolResponse {
        result: answer.context,
        source: "rag_tool".into(),
        context: Some(answer.snippets),
    }))
}

async fn sql_query_handler(
    State(state): State<SharedState>,
    Json(payload): Json<SqlQueryRequest>,
) -> Result<Json<ToolResponse>, ApiError> {
    let question = require("question", &payload.question)?;
    Ok(Json(ToolResponse {
        result: state.controller.sql_query(question).await,
        source: "sql_tool".into(),
        context: None,
    }))
}

async fn web_query_handler(
    State(state): State<SharedState>,
    Json(payload): Json<WebQueryRequest>,
) -> Result<Json<ToolResponse>, ApiError> {
    let query = require("query", &payload.query)?;
    Ok(Json(ToolResponse {
        result: state.controller.web_query(query, payload.max_results).await,
        source: "web_tool".into(),
        context: None,
    }))
}

async fn session_history_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<SessionHistoryResponse>, ApiError> {
    let turns = state.controller.history(&id).await?;
    Ok(Json(SessionHistoryResponse { session_id: id, turns }))
}

async fn session_reset_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResetResponse>, ApiError> {
    let reset = state.controller.reset_session(&id).await?;
    Ok(Json(SessionResetResponse { session_id: id, reset }))
}
