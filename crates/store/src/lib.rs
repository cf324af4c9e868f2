//! Conversation persistence for QuietMind.
//!
//! Users, conversations, and messages live in a single `journal.json` under
//! the configured state path, guarded by an in-process lock. Every mutation
//! is written through to disk before it becomes visible in memory, so a turn
//! either lands completely or not at all.

pub mod model;
pub mod store;

pub use model::{Conversation, Message, NewMessage, User};
pub use store::JournalStore;
