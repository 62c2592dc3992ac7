//! Authenticated principal extraction.
//!
//! Every protected endpoint goes through `require_auth`: extract the
//! token from the request, run the dual-store validation, and hand the
//! handler a principal. There are no fallback paths; an infrastructure
//! error is a 500, never a silent allow.

use axum::http::{HeaderMap, StatusCode};
use sqlx::PgPool;
use tracing::error;

use super::cache::SessionCache;
use super::session::{extract_session_token, validate_session, ValidateOutcome};

/// Authenticated caller context derived from a validated session.
#[derive(Clone, Debug)]
pub struct Principal {
    pub account_id: i64,
    pub session_id: i64,
}

/// Resolve a bearer token or session cookie into a principal.
///
/// Missing, unknown, revoked, and expired tokens are all 401; the
/// response never says which.
pub async fn require_auth(
    headers: &HeaderMap,
    pool: &PgPool,
    cache: &SessionCache,
) -> Result<Principal, StatusCode> {
    let Some(token) = extract_session_token(headers) else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    match validate_session(pool, cache, &token).await {
        Ok(ValidateOutcome::Valid(identity)) => Ok(Principal {
            account_id: identity.account_id,
            session_id: identity.session_id,
        }),
        Ok(ValidateOutcome::Invalid) => Err(StatusCode::UNAUTHORIZED),
        Err(err) => {
            error!("Failed to validate session: {err}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
