//! The conversation orchestrator — one request, one guided-exercise turn.
//!
//! Entry point: [`run_turn`]. Loads or creates the conversation, appends
//! the inbound user turn, invokes the turn engine, and commits the
//! resulting assistant turn plus the progress update as one atomic unit.

use std::sync::Arc;

use uuid::Uuid;

use qm_domain::chat::{Category, MessageType, Role};
use qm_domain::error::{Error, Result};
use qm_store::{Conversation, Message, NewMessage, User};

use crate::state::AppState;

use super::engine::TurnEngine;
use super::prompts;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Input / output
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Input to a single turn.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub category: Category,
    /// Free-text user message, if any.
    pub message: Option<String>,
    /// Existing conversation to continue. `None` starts a fresh exercise.
    pub conversation_id: Option<Uuid>,
    /// Index into the previous assistant message's choice list.
    pub selected_choice: Option<usize>,
}

/// The post-turn state returned to the caller: the conversation record and
/// its full transcript, ascending by `order`.
#[derive(Debug, Clone)]
pub struct TurnOutput {
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

impl TurnOutput {
    pub fn is_complete(&self) -> bool {
        self.conversation.is_complete
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// run_turn — the core orchestrator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Run one guided-exercise turn for an authenticated user.
///
/// Turns are serialized per conversation id; concurrent submissions for the
/// same conversation queue behind the in-flight one instead of racing on
/// the order sequence.
pub async fn run_turn(state: &AppState, user: &User, req: TurnRequest) -> Result<TurnOutput> {
    // ── Resolve or create the conversation ──────────────────────────
    let conversation_id = match req.conversation_id {
        Some(id) => {
            let conversation = state
                .store
                .get_conversation(id)
                .ok_or_else(|| Error::NotFound(format!("conversation {id}")))?;
            // Ownership is enforced: a foreign conversation resolves the
            // same as a missing one.
            if conversation.user_id != user.id {
                return Err(Error::NotFound(format!("conversation {id}")));
            }
            id
        }
        None => {
            let conversation = state.store.create_conversation(user.id, req.category)?;
            conversation.id
        }
    };

    // Serialize turns on this conversation. The permit is held until the
    // turn commits (released on drop).
    let _permit = state
        .conversation_locks
        .acquire(&conversation_id.to_string())
        .await
        .map_err(|e| Error::Other(e.to_string()))?;

    // Re-read under the lock: a queued turn must see the committed state
    // of the one that ran before it.
    let conversation = state
        .store
        .get_conversation(conversation_id)
        .ok_or_else(|| Error::NotFound(format!("conversation {conversation_id}")))?;
    let messages = state.store.messages(conversation_id);

    // ── Brand-new conversation: fixed opening, no completion call ────
    if messages.is_empty() {
        let opening = match conversation.category {
            Category::Gratitude => prompts::GRATITUDE_OPENING,
            Category::Anxiety => prompts::ANXIETY_OPENING,
        };
        state
            .store
            .append_message(conversation_id, NewMessage::text(Role::Assistant, opening))?;

        tracing::info!(
            conversation_id = %conversation_id,
            category = %conversation.category,
            "exercise started"
        );

        return Ok(TurnOutput {
            messages: state.store.messages(conversation_id),
            conversation,
        });
    }

    // ── No input on a non-fresh conversation: idempotent read ────────
    if req.message.is_none() && req.selected_choice.is_none() {
        return Ok(TurnOutput {
            conversation,
            messages,
        });
    }

    // ── Append the user turn, run the engine, commit atomically ──────
    let user_message = resolve_user_message(&req, &messages);
    let mut user_turns: Vec<String> = messages
        .iter()
        .filter(|m| m.role == Role::User)
        .map(|m| m.content.clone())
        .collect();
    user_turns.push(user_message.content.clone());

    let engine = TurnEngine::new(completion_client(state)?);
    let reply = engine.respond(conversation.category, &user_turns).await?;

    let assistant_message = match reply.message_type {
        MessageType::Choices => {
            NewMessage::choices(reply.content, reply.choices.unwrap_or_default())
        }
        _ => NewMessage::text(Role::Assistant, reply.content),
    };

    let is_complete = user_turns.len() as u32 >= conversation.category.max_user_turns();
    let conversation =
        state
            .store
            .commit_turn(conversation_id, user_message, assistant_message, is_complete)?;

    tracing::info!(
        conversation_id = %conversation_id,
        step = conversation.current_step,
        is_complete = conversation.is_complete,
        "turn committed"
    );

    Ok(TurnOutput {
        messages: state.store.messages(conversation_id),
        conversation,
    })
}

/// Resolve the content to record for the inbound user turn.
///
/// A selection indexes into the previous assistant message's choice list.
/// An out-of-range index, or a previous message without choices, falls back
/// to the raw submitted text — which may be empty.
fn resolve_user_message(req: &TurnRequest, messages: &[Message]) -> NewMessage {
    match req.selected_choice {
        Some(index) => {
            let resolved = messages
                .last()
                .and_then(|m| m.choices.as_ref())
                .and_then(|choices| choices.get(index))
                .cloned();
            let content =
                resolved.unwrap_or_else(|| req.message.clone().unwrap_or_default());
            NewMessage::choice_selection(content, index)
        }
        None => NewMessage::text(Role::User, req.message.clone().unwrap_or_default()),
    }
}

fn completion_client(state: &AppState) -> Result<Arc<dyn qm_providers::CompletionClient>> {
    state
        .llm
        .clone()
        .ok_or_else(|| Error::Config("no completion provider configured".into()))
}
