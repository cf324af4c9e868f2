//! Chat API endpoints — the interface for running exercise turns.
//!
//! - `POST /v1/chat`                — run one guided-exercise turn
//! - `GET  /v1/conversations`       — list the caller's conversations
//! - `GET  /v1/conversations/:id`   — read one transcript

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use uuid::Uuid;

use qm_domain::chat::Category;
use qm_domain::error::Error;
use qm_store::{Conversation, Message, User};

use crate::runtime::{run_turn, TurnOutput, TurnRequest};
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request shape
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Exercise category. Closed enum: unknown values fail request
    /// deserialization before any engine or store work.
    pub category: Category,
    /// Free-text user message.
    #[serde(default)]
    pub message: Option<String>,
    /// Conversation to continue. Absent = start a fresh exercise.
    #[serde(default)]
    pub conversation_id: Option<Uuid>,
    /// Index into the previous assistant message's choice list.
    #[serde(default)]
    pub selected_choice: Option<usize>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Build a standardized JSON error response: `{ "error": "<message>" }`.
fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// Map the orchestrator error taxonomy onto HTTP statuses.
fn error_response(err: Error) -> Response {
    let status = match &err {
        Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Provider { .. } | Error::Http(_) | Error::Timeout(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "chat request failed");
    }
    api_error(status, err.to_string())
}

/// Serialize a conversation with its transcript embedded, ascending by
/// `order`, plus the top-level completion flag.
fn transcript_response(conversation: &Conversation, messages: &[Message]) -> Response {
    Json(serde_json::json!({
        "conversation": {
            "id": conversation.id,
            "user_id": conversation.user_id,
            "category": conversation.category,
            "current_step": conversation.current_step,
            "total_steps": conversation.total_steps,
            "is_complete": conversation.is_complete,
            "created_at": conversation.created_at,
            "updated_at": conversation.updated_at,
            "messages": messages,
        },
        "is_complete": conversation.is_complete,
    }))
    .into_response()
}

/// Pre-flight: return a structured 503 if no completion provider is
/// configured, instead of a vague failure mid-turn.
fn require_completion_provider(state: &AppState) -> Result<(), Response> {
    if state.llm.is_some() {
        return Ok(());
    }
    Err(api_error(
        StatusCode::SERVICE_UNAVAILABLE,
        "no completion provider configured — set the API key env var named in [llm].api_key_env",
    ))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/chat
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn chat(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(body): Json<ChatRequest>,
) -> Response {
    // Only turns that actually invoke the engine need the provider, but a
    // consistent early 503 beats failing three steps into an exercise.
    if let Err(resp) = require_completion_provider(&state) {
        return resp;
    }

    let req = TurnRequest {
        category: body.category,
        message: body.message,
        conversation_id: body.conversation_id,
        selected_choice: body.selected_choice,
    };

    match run_turn(&state, &user, req).await {
        Ok(TurnOutput {
            conversation,
            messages,
        }) => transcript_response(&conversation, &messages),
        Err(e) => error_response(e),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /v1/conversations
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Response {
    let conversations = state.store.conversations_for_user(user.id);
    let count = conversations.len();
    Json(serde_json::json!({
        "conversations": conversations,
        "count": count,
    }))
    .into_response()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /v1/conversations/:id
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn get_conversation(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Response {
    let conversation = match state.store.get_conversation(id) {
        // A foreign conversation reads the same as a missing one.
        Some(c) if c.user_id == user.id => c,
        _ => return api_error(StatusCode::NOT_FOUND, format!("conversation {id}")),
    };
    let messages = state.store.messages(id);
    transcript_response(&conversation, &messages)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /v1/readiness
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Public probe: reports whether a completion provider is configured.
pub async fn readiness(State(state): State<AppState>) -> Response {
    let provider = state.llm.as_ref().map(|p| p.provider_id().to_string());
    Json(serde_json::json!({
        "ready": provider.is_some(),
        "provider": provider,
        "model": state.config.llm.model,
    }))
    .into_response()
}
