pub mod auth;
pub mod chat;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
///
/// Routes are split into **public** (the readiness probe) and **protected**
/// (gated behind the identity middleware, which enforces the optional
/// service token and resolves the requesting user).
///
/// `state` is needed to wire up the auth middleware at build time.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        // Provider readiness (used by health probes)
        .route("/v1/readiness", get(chat::readiness));

    let protected = Router::new()
        // Chat (core runtime)
        .route("/v1/chat", post(chat::chat))
        // Transcripts
        .route("/v1/conversations", get(chat::list_conversations))
        .route("/v1/conversations/:id", get(chat::get_conversation))
        // Apply identity middleware to all protected routes.
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_identity,
        ));

    public.merge(protected)
}
