//! HTTP Handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use agent_core::{ExecutionEvent, SessionId, ToolSchema, Turn};
use agent_core::session::SharedSession;

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub llm_provider: String,
    pub llm_connected: bool,
    pub search_connected: bool,
    pub search_backend: String,
    pub active_conversations: usize,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
    pub conversation_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MemoryResponse {
    pub conversation_id: String,
    pub turns: Vec<Turn>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogResponse {
    pub conversation_id: String,
    pub events: Vec<ExecutionEvent>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

fn find_session(state: &AppState, id: &str) -> Result<SharedSession, ApiError> {
    state
        .sessions
        .get(&SessionId::from_string(id))
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "UNKNOWN_CONVERSATION", format!("No conversation '{id}'")))
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (llm_connected, search_connected) = tokio::join!(
        state.provider.health_check(),
        state.search.health_check(),
    );

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        llm_provider: state.provider.name().to_string(),
        llm_connected: llm_connected.unwrap_or(false),
        search_connected,
        search_backend: state.search.name().to_string(),
        active_conversations: state.sessions.len(),
    })
}

/// Run one agent turn in a conversation, creating it if needed
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "EMPTY_MESSAGE", "Message must not be empty"));
    }

    let id = payload
        .conversation_id
        .map(SessionId::from_string)
        .unwrap_or_default();

    let session = state
        .sessions
        .get_or_create(&id, |id| state.new_session(id))
        .map_err(|e| {
            tracing::error!("Failed to start conversation: {e}");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "AGENT_ERROR", e.user_message())
        })?;

    // Turns within one conversation run one at a time.
    let message = session.lock().await.chat(&payload.message).await;

    Ok(Json(ChatResponse {
        message,
        conversation_id: id.to_string(),
    }))
}

/// Remembered turns of a conversation
pub async fn get_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MemoryResponse>, ApiError> {
    let session = find_session(&state, &id)?;
    let turns = session.lock().await.memory_summary().to_vec();

    Ok(Json(MemoryResponse {
        conversation_id: id,
        turns,
    }))
}

/// Forget a conversation's history
pub async fn clear_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let session = find_session(&state, &id)?;
    session.lock().await.clear_memory();
    Ok(StatusCode::NO_CONTENT)
}

/// End a conversation and release its memory
pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(&SessionId::from_string(id.as_str())) {
        tracing::info!(conversation = %id, "Conversation deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(api_error(StatusCode::NOT_FOUND, "UNKNOWN_CONVERSATION", format!("No conversation '{id}'")))
    }
}

/// Execution events recorded for a conversation
pub async fn get_log(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LogResponse>, ApiError> {
    let session = find_session(&state, &id)?;
    let events = session.lock().await.execution_log();

    Ok(Json(LogResponse {
        conversation_id: id,
        events,
    }))
}

/// Registered tools in registration order
pub async fn list_tools(State(state): State<AppState>) -> Json<Vec<ToolSchema>> {
    Json(state.tools.schemas())
}
