//! Persisted record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use qm_domain::chat::{Category, MessageType, Role};

/// An identity record. Created on first authenticated access, never mutated
/// or deleted afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// External identity (the authenticated subject), exact-match lookup key.
    pub auth_subject: String,
    pub created_at: DateTime<Utc>,
}

/// One guided exercise instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Immutable after creation.
    pub category: Category,
    /// Starts at 1, incremented once per completed turn.
    pub current_step: u32,
    /// Derived from `category` at creation time, never recomputed.
    pub total_steps: u32,
    pub is_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One turn in a conversation. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: Role,
    pub content: String,
    pub message_type: MessageType,
    /// Present only when `message_type` is `choices`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    /// Present only when `message_type` is `choice_selection`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_choice: Option<usize>,
    /// The conversation's step at the time of creation.
    pub step: u32,
    /// Contiguous 1..N within a conversation; the sole ordering key.
    pub order: u32,
    pub created_at: DateTime<Utc>,
}

/// Message content prepared by the orchestrator before the store assigns
/// identity, step, and order.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub role: Role,
    pub content: String,
    pub message_type: MessageType,
    pub choices: Option<Vec<String>>,
    pub selected_choice: Option<usize>,
}

impl NewMessage {
    /// A plain text message.
    pub fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            message_type: MessageType::Text,
            choices: None,
            selected_choice: None,
        }
    }

    /// An assistant message carrying a choice list.
    pub fn choices(content: impl Into<String>, choices: Vec<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            message_type: MessageType::Choices,
            choices: Some(choices),
            selected_choice: None,
        }
    }

    /// A user message recording a pick from the previous choice list.
    pub fn choice_selection(content: impl Into<String>, selected: usize) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            message_type: MessageType::ChoiceSelection,
            choices: None,
            selected_choice: Some(selected),
        }
    }
}
