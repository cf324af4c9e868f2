//! Turn execution: the per-category state machine and its orchestration.

pub mod conversation_lock;
pub mod engine;
pub mod prompts;
pub mod turn;

pub use conversation_lock::ConversationLockMap;
pub use turn::{run_turn, TurnOutput, TurnRequest};
