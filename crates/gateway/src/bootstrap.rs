//! AppState construction extracted from `main.rs`.

use std::sync::Arc;

use anyhow::Context;
use sha2::{Digest, Sha256};

use qm_domain::config::Config;
use qm_providers::{CompletionClient, OpenAiCompatClient};
use qm_store::JournalStore;

use crate::runtime::ConversationLockMap;
use crate::state::AppState;

/// Initialize every subsystem and return a fully-wired [`AppState`].
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Journal store ────────────────────────────────────────────────
    let store = Arc::new(
        JournalStore::new(&config.storage.state_path).context("initializing journal store")?,
    );

    // ── Completion provider ──────────────────────────────────────────
    // A missing API key keeps the server bootable: readiness reports
    // not-ready and chat requests get a clear 503.
    let llm: Option<Arc<dyn CompletionClient>> = match OpenAiCompatClient::from_config(&config.llm)
    {
        Ok(client) => {
            tracing::info!(
                base_url = %config.llm.base_url,
                model = %config.llm.model,
                "completion provider ready"
            );
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "no completion provider — chat endpoints will return 503");
            None
        }
    };

    // ── Service token ────────────────────────────────────────────────
    let api_token_hash = read_api_token_hash(&config.server.api_token_env);

    Ok(AppState {
        config,
        store,
        llm,
        conversation_locks: Arc::new(ConversationLockMap::new()),
        api_token_hash,
    })
}

/// Read the service bearer token env var once and cache its SHA-256 digest.
/// Unset or empty means dev mode (no service auth).
fn read_api_token_hash(env_name: &str) -> Option<Vec<u8>> {
    match std::env::var(env_name) {
        Ok(token) if !token.is_empty() => Some(Sha256::digest(token.as_bytes()).to_vec()),
        _ => {
            tracing::warn!(
                env = env_name,
                "service token not set — API accessible without a bearer token (dev mode)"
            );
            None
        }
    }
}
