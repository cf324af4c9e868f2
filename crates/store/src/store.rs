//! Gateway-owned journal store.
//!
//! Persists users, conversations, and messages in `journal.json` under the
//! configured state path. Mutations are written to disk first; in-memory
//! state is swapped only when the write succeeds, so the two-insert-plus-
//! update turn commit is atomic from the caller's point of view.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use qm_domain::chat::Category;
use qm_domain::error::{Error, Result};

use crate::model::{Conversation, Message, NewMessage, User};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Persisted state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct JournalState {
    #[serde(default)]
    users: HashMap<Uuid, User>,
    #[serde(default)]
    conversations: HashMap<Uuid, Conversation>,
    /// Messages per conversation, kept sorted ascending by `order`.
    #[serde(default)]
    messages: HashMap<Uuid, Vec<Message>>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Journal store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Journal store backed by a JSON file.
pub struct JournalStore {
    journal_path: PathBuf,
    state: RwLock<JournalState>,
}

impl JournalStore {
    /// Load or create the store at `state_path/journal/journal.json`.
    pub fn new(state_path: impl AsRef<Path>) -> Result<Self> {
        let dir = state_path.as_ref().join("journal");
        std::fs::create_dir_all(&dir).map_err(Error::Io)?;

        let journal_path = dir.join("journal.json");
        let state = if journal_path.exists() {
            let raw = std::fs::read_to_string(&journal_path).map_err(Error::Io)?;
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            JournalState::default()
        };

        tracing::info!(
            users = state.users.len(),
            conversations = state.conversations.len(),
            path = %journal_path.display(),
            "journal store loaded"
        );

        Ok(Self {
            journal_path,
            state: RwLock::new(state),
        })
    }

    // ── Users ─────────────────────────────────────────────────────────

    /// Resolve or create the user for an authenticated subject.
    /// Returns `(user, is_new)`.
    pub fn get_or_create_user(&self, auth_subject: &str) -> Result<(User, bool)> {
        // Fast path: user already exists.
        {
            let state = self.state.read();
            if let Some(user) = state
                .users
                .values()
                .find(|u| u.auth_subject == auth_subject)
            {
                return Ok((user.clone(), false));
            }
        }

        let user = User {
            id: Uuid::new_v4(),
            auth_subject: auth_subject.to_owned(),
            created_at: Utc::now(),
        };

        let created = user.clone();
        self.mutate(move |state| {
            // A concurrent request may have created the user between the
            // read above and this write. Keep the winner.
            if let Some(existing) = state
                .users
                .values()
                .find(|u| u.auth_subject == created.auth_subject)
            {
                return Some(existing.clone());
            }
            state.users.insert(created.id, created.clone());
            None
        })
        .map(|raced| match raced {
            Some(existing) => (existing, false),
            None => (user, true),
        })
    }

    // ── Conversations ─────────────────────────────────────────────────

    /// Create a fresh conversation for a user. `total_steps` is derived from
    /// the category here and never recomputed.
    pub fn create_conversation(&self, user_id: Uuid, category: Category) -> Result<Conversation> {
        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            user_id,
            category,
            current_step: 1,
            total_steps: category.total_steps(),
            is_complete: false,
            created_at: now,
            updated_at: now,
        };

        let stored = conversation.clone();
        self.mutate(move |state| {
            state.conversations.insert(stored.id, stored.clone());
            state.messages.insert(stored.id, Vec::new());
            None::<()>
        })?;

        tracing::debug!(
            conversation_id = %conversation.id,
            category = %category,
            "conversation created"
        );

        Ok(conversation)
    }

    /// Look up a conversation by id.
    pub fn get_conversation(&self, id: Uuid) -> Option<Conversation> {
        self.state.read().conversations.get(&id).cloned()
    }

    /// All conversations owned by a user, newest first.
    pub fn conversations_for_user(&self, user_id: Uuid) -> Vec<Conversation> {
        let state = self.state.read();
        let mut out: Vec<Conversation> = state
            .conversations
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    // ── Messages ──────────────────────────────────────────────────────

    /// Transcript of a conversation, ascending by `order`.
    pub fn messages(&self, conversation_id: Uuid) -> Vec<Message> {
        self.state
            .read()
            .messages
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Append a single message, assigning the next `order` value and the
    /// conversation's current step. Used for the opening assistant message.
    pub fn append_message(&self, conversation_id: Uuid, new: NewMessage) -> Result<Message> {
        self.mutate(move |state| {
            let step = state
                .conversations
                .get(&conversation_id)
                .map(|c| c.current_step)?;
            let list = state.messages.entry(conversation_id).or_default();
            let message = materialize(conversation_id, new.clone(), step, list.len() as u32 + 1);
            list.push(message.clone());
            Some(message)
        })?
        .ok_or_else(|| Error::NotFound(format!("conversation {conversation_id}")))
    }

    /// Commit one full turn as an atomic unit: the user message, the
    /// assistant message, the step increment, and the completion flag.
    /// Nothing becomes visible if the disk write fails, so a failed
    /// completion call never leaves an unanswered user turn behind.
    ///
    /// The completion flag is monotone: once set it never reverts.
    pub fn commit_turn(
        &self,
        conversation_id: Uuid,
        user: NewMessage,
        assistant: NewMessage,
        is_complete: bool,
    ) -> Result<Conversation> {
        self.mutate(move |state| {
            let step = state.conversations.get(&conversation_id)?.current_step;

            let list = state.messages.entry(conversation_id).or_default();
            let base = list.len() as u32;
            list.push(materialize(conversation_id, user.clone(), step, base + 1));
            list.push(materialize(conversation_id, assistant.clone(), step, base + 2));

            let conversation = state.conversations.get_mut(&conversation_id)?;
            conversation.current_step += 1;
            conversation.is_complete = conversation.is_complete || is_complete;
            conversation.updated_at = Utc::now();
            Some(conversation.clone())
        })?
        .ok_or_else(|| Error::NotFound(format!("conversation {conversation_id}")))
    }

    /// Persist the current state to disk.
    pub fn flush(&self) -> Result<()> {
        let state = self.state.read();
        write_state(&self.journal_path, &state)
    }

    // ── Private helpers ───────────────────────────────────────────────

    /// Apply a mutation with write-through persistence.
    ///
    /// The mutation runs against a clone of the current state; the clone is
    /// written to disk first and swapped into memory only on I/O success.
    fn mutate<T>(&self, f: impl FnOnce(&mut JournalState) -> T) -> Result<T> {
        let mut guard = self.state.write();
        let mut next = guard.clone();
        let out = f(&mut next);
        write_state(&self.journal_path, &next)?;
        *guard = next;
        Ok(out)
    }
}

/// Assign identity, step, and order to a prepared message.
fn materialize(conversation_id: Uuid, new: NewMessage, step: u32, order: u32) -> Message {
    Message {
        id: Uuid::new_v4(),
        conversation_id,
        role: new.role,
        content: new.content,
        message_type: new.message_type,
        choices: new.choices,
        selected_choice: new.selected_choice,
        step,
        order,
        created_at: Utc::now(),
    }
}

fn write_state(path: &Path, state: &JournalState) -> Result<()> {
    let json = serde_json::to_string_pretty(state)
        .map_err(|e| Error::Other(format!("serializing journal: {e}")))?;
    std::fs::write(path, json).map_err(Error::Io)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qm_domain::chat::{MessageType, Role};

    fn store() -> (tempfile::TempDir, JournalStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JournalStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn get_or_create_user_is_idempotent() {
        let (_dir, store) = store();
        let (first, created) = store.get_or_create_user("subject-1").unwrap();
        assert!(created);
        let (second, created) = store.get_or_create_user("subject-1").unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn total_steps_follows_category_table() {
        let (_dir, store) = store();
        let (user, _) = store.get_or_create_user("s").unwrap();
        let g = store
            .create_conversation(user.id, Category::Gratitude)
            .unwrap();
        let a = store.create_conversation(user.id, Category::Anxiety).unwrap();
        assert_eq!(g.total_steps, 3);
        assert_eq!(a.total_steps, 4);
        assert_eq!(g.current_step, 1);
        assert!(!g.is_complete);
    }

    #[test]
    fn order_is_contiguous_from_one() {
        let (_dir, store) = store();
        let (user, _) = store.get_or_create_user("s").unwrap();
        let conv = store
            .create_conversation(user.id, Category::Gratitude)
            .unwrap();

        store
            .append_message(conv.id, NewMessage::text(Role::Assistant, "hello"))
            .unwrap();
        store
            .commit_turn(
                conv.id,
                NewMessage::text(Role::User, "my dog"),
                NewMessage::text(Role::Assistant, "tell me more"),
                false,
            )
            .unwrap();
        store
            .commit_turn(
                conv.id,
                NewMessage::text(Role::User, "she greets me"),
                NewMessage::text(Role::Assistant, "wrap-up"),
                true,
            )
            .unwrap();

        let orders: Vec<u32> = store.messages(conv.id).iter().map(|m| m.order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn commit_turn_advances_step_and_completion_is_monotone() {
        let (_dir, store) = store();
        let (user, _) = store.get_or_create_user("s").unwrap();
        let conv = store
            .create_conversation(user.id, Category::Gratitude)
            .unwrap();

        let after = store
            .commit_turn(
                conv.id,
                NewMessage::text(Role::User, "a"),
                NewMessage::text(Role::Assistant, "b"),
                true,
            )
            .unwrap();
        assert_eq!(after.current_step, 2);
        assert!(after.is_complete);

        // A later turn with is_complete = false must not revert the flag.
        let after = store
            .commit_turn(
                conv.id,
                NewMessage::text(Role::User, "c"),
                NewMessage::text(Role::Assistant, "d"),
                false,
            )
            .unwrap();
        assert!(after.is_complete);
    }

    #[test]
    fn messages_record_step_at_creation_time() {
        let (_dir, store) = store();
        let (user, _) = store.get_or_create_user("s").unwrap();
        let conv = store.create_conversation(user.id, Category::Anxiety).unwrap();

        store
            .append_message(conv.id, NewMessage::text(Role::Assistant, "opening"))
            .unwrap();
        store
            .commit_turn(
                conv.id,
                NewMessage::text(Role::User, "worried"),
                NewMessage::choices("pick one", vec!["a".into(), "b".into()]),
                false,
            )
            .unwrap();

        let messages = store.messages(conv.id);
        assert_eq!(messages[0].step, 1);
        assert_eq!(messages[1].step, 1);
        assert_eq!(messages[2].step, 1);
        assert_eq!(messages[2].message_type, MessageType::Choices);
        assert_eq!(store.get_conversation(conv.id).unwrap().current_step, 2);
    }

    #[test]
    fn state_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let conv_id;
        {
            let store = JournalStore::new(dir.path()).unwrap();
            let (user, _) = store.get_or_create_user("s").unwrap();
            let conv = store
                .create_conversation(user.id, Category::Gratitude)
                .unwrap();
            conv_id = conv.id;
            store
                .append_message(conv.id, NewMessage::text(Role::Assistant, "opening"))
                .unwrap();
        }

        let reloaded = JournalStore::new(dir.path()).unwrap();
        let conv = reloaded.get_conversation(conv_id).unwrap();
        assert_eq!(conv.category, Category::Gratitude);
        let messages = reloaded.messages(conv_id);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "opening");
    }

    #[test]
    fn append_to_unknown_conversation_is_not_found() {
        let (_dir, store) = store();
        let err = store
            .append_message(Uuid::new_v4(), NewMessage::text(Role::User, "x"))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
