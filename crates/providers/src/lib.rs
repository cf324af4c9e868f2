//! Completion-client adapters.
//!
//! One trait, one hosted adapter: QuietMind makes exactly one kind of model
//! call (system instructions + one user turn, full response, no streaming),
//! so the seam is a single async method.

pub mod openai_compat;
pub mod traits;
mod util;

pub use openai_compat::OpenAiCompatClient;
pub use traits::CompletionClient;
