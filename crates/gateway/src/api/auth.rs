//! Identity middleware.
//!
//! Two layers, both resolved here:
//! - An optional **service token**: the env var named by
//!   `config.server.api_token_env` (default `QM_API_TOKEN`) is read once at
//!   startup and its SHA-256 digest cached in `AppState`. When set, every
//!   protected request must carry `Authorization: Bearer <token>`. When
//!   unset, the server logs a warning once and skips the check (dev mode).
//! - The **user subject**: identity provisioning is delegated to an
//!   upstream auth layer, which forwards the authenticated subject in the
//!   `x-auth-subject` header. A request without a subject is Unauthorized.
//!   The matching user record is created on first access.

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use qm_store::User;

use crate::state::AppState;

/// Axum middleware that enforces the service token and resolves the
/// requesting user. Attach via `axum::middleware::from_fn_with_state`.
/// On success the [`User`] record is inserted into request extensions.
pub async fn require_identity(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    // ── Service token (skipped in dev mode) ─────────────────────────
    if let Some(expected_hash) = &state.api_token_hash {
        let provided = req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .unwrap_or("");

        // Hash the provided token to a fixed-length digest, then compare
        // in constant time. This avoids leaking the token length.
        let provided_hash = Sha256::digest(provided.as_bytes());
        if !bool::from(provided_hash.ct_eq(expected_hash.as_slice())) {
            return unauthorized("invalid or missing API token");
        }
    }

    // ── User subject ────────────────────────────────────────────────
    let subject = req
        .headers()
        .get("x-auth-subject")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);

    let subject = match subject {
        Some(s) => s,
        None => return unauthorized("no authenticated subject"),
    };

    let user = match state.store.get_or_create_user(&subject) {
        Ok((user, is_new)) => {
            if is_new {
                tracing::info!(user_id = %user.id, "user created on first access");
            }
            user
        }
        Err(e) => {
            tracing::error!(error = %e, "resolving user failed");
            return (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(serde_json::json!({ "error": "failed to resolve user" })),
            )
                .into_response();
        }
    };

    req.extensions_mut().insert(user);
    next.run(req).await
}

fn unauthorized(message: &str) -> Response {
    (
        axum::http::StatusCode::UNAUTHORIZED,
        axum::Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}
