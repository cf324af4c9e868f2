use std::sync::Arc;

use qm_domain::config::Config;
use qm_providers::CompletionClient;
use qm_store::JournalStore;

use crate::runtime::ConversationLockMap;

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// Users, conversations, messages.
    pub store: Arc<JournalStore>,

    /// Completion provider. `None` when no API key is configured — the
    /// server still boots, and chat requests fail with a clear 503.
    pub llm: Option<Arc<dyn CompletionClient>>,

    /// Per-conversation turn locks.
    pub conversation_locks: Arc<ConversationLockMap>,

    /// SHA-256 hash of the service bearer token (read once at startup).
    /// `None` = dev mode (no service auth enforced).
    pub api_token_hash: Option<Vec<u8>>,
}
