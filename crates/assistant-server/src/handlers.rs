//! HTTP/SSE Handlers

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequestParts, Path, State},
    http::{HeaderMap, StatusCode, request::Parts},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::Stream;
use serde::Serialize;
use thiserror::Error;
use tokio_stream::StreamExt;

use assistant_core::{AgentError, ChatEvent, Session, SessionId, TurnRequest, session::SessionSummary};

use crate::state::AppState;

/// Header carrying the caller's identity
pub const USER_HEADER: &str = "x-user-id";

/// Header naming the selected cluster
pub const CLUSTER_HEADER: &str = "x-cluster";

const SESSION_LIST_LIMIT: usize = 50;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing x-user-id header")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, error) = match &self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            Self::Agent(e @ AgentError::SessionNotFound(_)) => {
                (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND", e.user_message())
            }
            Self::Agent(e @ AgentError::Config(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AI_CONFIG_ERROR",
                format!("Failed to create AI client: {e}"),
            ),
            Self::Agent(e) => (StatusCode::INTERNAL_SERVER_ERROR, "AGENT_ERROR", e.user_message()),
        };
        if status.is_server_error() {
            tracing::error!(code, error = %self, "Request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error,
                code: code.into(),
            }),
        )
            .into_response()
    }
}

// ============================================================================
// Extractors
// ============================================================================

/// Authenticated user, from the identity header
#[derive(Debug, Clone)]
pub struct UserId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for UserId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header(&parts.headers, USER_HEADER)
            .map(|id| Self(id.to_string()))
            .ok_or(ApiError::Unauthorized)
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: String,
    pub model: String,
    pub tools: Vec<String>,
    pub clusters: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub provider: String,
    pub default_model: String,
    pub models: Vec<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider: state.provider_config.kind.to_string(),
        model: state.provider_config.default_model.clone(),
        tools: state.tools.names().into_iter().map(str::to_string).collect(),
        clusters: state.cluster_names().into_iter().map(str::to_string).collect(),
    })
}

/// Default model first, then the other allowed models
pub async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    let config = &state.provider_config;
    let mut models = vec![config.default_model.clone()];
    models.extend(
        config
            .allowed_models
            .iter()
            .filter(|m| **m != config.default_model)
            .cloned(),
    );
    Json(ModelsResponse {
        provider: config.kind.to_string(),
        default_model: config.default_model.clone(),
        models,
    })
}

/// One chat turn, streamed as Server-Sent Events
pub async fn chat(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    headers: HeaderMap,
    Json(request): Json<TurnRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("Message is required".into()));
    }

    let cluster = header(&headers, CLUSTER_HEADER);
    let ctx = state
        .tool_context(cluster)
        .ok_or_else(|| ApiError::NotFound(format!("Cluster not found: {}", cluster.unwrap_or_default())))?;

    let agent = state.agent_for_turn(request.model_override.as_deref()).await?;
    tracing::info!(
        user_id = %user_id,
        cluster = ctx.target_name().unwrap_or("<none>"),
        session_id = request.session_id.as_deref().unwrap_or("<new>"),
        "Starting chat turn"
    );

    let events = Arc::new(agent)
        .stream_turn(user_id, request, ctx)
        .map(|event| Ok(to_sse(&event)));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn to_sse(event: &ChatEvent) -> Event {
    let sse = Event::default().event(event.name());
    match serde_json::to_string(event) {
        Ok(data) => sse.data(data),
        Err(e) => {
            tracing::error!(event = event.name(), error = %e, "Failed to encode event");
            sse.data("{}")
        }
    }
}

/// The caller's sessions, most recent first
pub async fn list_sessions(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> Result<Json<Vec<SessionSummary>>, ApiError> {
    let sessions = state.store.list_sessions(&user_id, SESSION_LIST_LIMIT).await?;
    Ok(Json(sessions))
}

/// One session with its message log
pub async fn get_session(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    let session = state.store.load_session(&SessionId::from_string(id), &user_id).await?;
    Ok(Json(session))
}
