//! Session Manager: the dual-store lifecycle protocol.
//!
//! Sessions live in two places: the durable store (authoritative) and
//! the cache (fast-path gate). Creation commits durably first and then
//! publishes to the cache, compensating with an immediate revoke if
//! the publish fails, so a client never holds a token the fast path
//! cannot see. Revocation flips the durable row first and then deletes
//! the cache entry; a failed delete is reported to the caller because
//! "durable says revoked, cache says valid" is the one divergence this
//! protocol must never leave silently in place. Validation treats a
//! cache miss as conclusive and a cache hit as provisional, evicting
//! stale entries it discovers (self-healing read).

use anyhow::{anyhow, Context, Result};
use axum::{
    extract::Extension,
    http::{
        header::{InvalidHeaderValue, AUTHORIZATION, COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, warn};

use super::cache::SessionCache;
use super::state::{AuthConfig, AuthState};
use super::storage;
use super::utils::{hash_session_token, is_unique_violation};

pub(crate) const SESSION_COOKIE_NAME: &str = "gardi_session";

/// Advisory client metadata recorded with a session. Never consulted
/// for authorization decisions.
#[derive(Debug, Default)]
pub(crate) struct ClientMetadata {
    pub(crate) device_info: Option<String>,
    pub(crate) ip_address: Option<String>,
    pub(crate) location: Option<String>,
}

pub(crate) struct NewSession {
    pub(crate) token: String,
    pub(crate) session_id: i64,
    pub(crate) expires_at: DateTime<Utc>,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum RevokeOutcome {
    Revoked,
    NotFound,
}

/// Resolved identity of a validated session.
pub(crate) struct Identity {
    pub(crate) account_id: i64,
    pub(crate) session_id: i64,
}

pub(crate) enum ValidateOutcome {
    Valid(Identity),
    Invalid,
}

/// Create a session for an account that already passed authentication.
///
/// One durable transaction covers the authenticator's success-side
/// account update and the session insert; the cache entry is written
/// only after the commit.
pub(crate) async fn create_session(
    pool: &PgPool,
    cache: &SessionCache,
    config: &AuthConfig,
    account_id: i64,
    metadata: &ClientMetadata,
) -> Result<NewSession> {
    let ttl_seconds = config.session_ttl_seconds();

    for _ in 0..3 {
        let token = super::utils::generate_session_token()?;
        let token_hash = hash_session_token(&token);

        let mut tx = pool.begin().await.context("begin session transaction")?;
        storage::reset_login_state(&mut tx, account_id).await?;

        match storage::insert_session_row(&mut tx, account_id, &token_hash, metadata, ttl_seconds)
            .await
        {
            Ok((session_id, expires_at)) => {
                tx.commit().await.context("commit session transaction")?;

                if let Err(err) = cache
                    .put(&token_hash, account_id, config.session_ttl())
                    .await
                {
                    // A durable session the fast path cannot see would
                    // only surface as spurious logouts; take it back out.
                    if let Err(revoke_err) = storage::deactivate_session(pool, &token_hash).await {
                        error!("Failed to compensate unpublished session: {revoke_err}");
                    }
                    return Err(err).context("failed to publish session to cache");
                }

                return Ok(NewSession {
                    token,
                    session_id,
                    expires_at,
                });
            }
            Err(err) if is_unique_violation(&err) => {
                let _ = tx.rollback().await;
            }
            Err(err) => return Err(err).context("failed to insert session"),
        }
    }

    Err(anyhow!("failed to generate unique session token"))
}

/// Validate a token against both stores.
///
/// The cache is the gate: a miss is a conclusive deny even if the
/// durable store still shows the session active (fail closed). A hit
/// is provisional until the durable store confirms the row is usable
/// and belongs to the cached account; anything else evicts the entry.
pub(crate) async fn validate_session(
    pool: &PgPool,
    cache: &SessionCache,
    token: &str,
) -> Result<ValidateOutcome> {
    let token_hash = hash_session_token(token);

    let Some(cached_account) = cache.get(&token_hash).await? else {
        return Ok(ValidateOutcome::Invalid);
    };

    match storage::lookup_live_session(pool, &token_hash).await? {
        Some(live) if live.account_id == cached_account => {
            // Refresh-on-access is best effort; it never blocks an
            // otherwise valid session.
            if let Err(err) = storage::touch_session(pool, live.id).await {
                warn!("Failed to refresh session activity: {err}");
            }
            Ok(ValidateOutcome::Valid(Identity {
                account_id: live.account_id,
                session_id: live.id,
            }))
        }
        _ => {
            if let Err(err) = cache.evict(&token_hash).await {
                warn!("Failed to evict stale session from cache: {err}");
            }
            Ok(ValidateOutcome::Invalid)
        }
    }
}

/// Revoke a session by token. Exactly one of two concurrent revokes
/// succeeds; the other sees zero rows and reports `NotFound`.
pub(crate) async fn revoke_session(
    pool: &PgPool,
    cache: &SessionCache,
    token: &str,
) -> Result<RevokeOutcome> {
    let token_hash = hash_session_token(token);

    let mut tx = pool.begin().await.context("begin revoke transaction")?;
    let rows = storage::deactivate_session(&mut *tx, &token_hash).await?;
    if rows == 0 {
        let _ = tx.rollback().await;
        return Ok(RevokeOutcome::NotFound);
    }
    tx.commit().await.context("commit revoke transaction")?;

    // Durable state is already revoked; a failed delete here must
    // surface so the caller never mistakes a stale cache entry for a
    // completed logout. The next validate self-heals the entry.
    cache
        .evict(&token_hash)
        .await
        .context("failed to evict revoked session from cache")?;

    Ok(RevokeOutcome::Revoked)
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 204, description = "Session revoked"),
        (status = 400, description = "No session token presented", body = String),
        (status = 404, description = "Unknown or already revoked session", body = String)
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    cache: Extension<SessionCache>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let Some(token) = extract_session_token(&headers) else {
        return (StatusCode::BAD_REQUEST, "No session presented".to_string()).into_response();
    };

    match revoke_session(&pool, &cache, &token).await {
        Ok(RevokeOutcome::Revoked) => {
            let mut response_headers = HeaderMap::new();
            if let Ok(cookie) = clear_session_cookie(auth_state.config()) {
                response_headers.insert(SET_COOKIE, cookie);
            }
            (StatusCode::NO_CONTENT, response_headers).into_response()
        }
        Ok(RevokeOutcome::NotFound) => {
            (StatusCode::NOT_FOUND, "Unknown session".to_string()).into_response()
        }
        Err(err) => {
            error!("Failed to revoke session: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Build a secure `HttpOnly` cookie for the session token.
pub(super) fn session_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revoke_outcome_debug_names() {
        assert_eq!(format!("{:?}", RevokeOutcome::Revoked), "Revoked");
        assert_eq!(format!("{:?}", RevokeOutcome::NotFound), "NotFound");
    }

    #[test]
    fn session_cookie_flags() {
        let config = AuthConfig::new().with_session_ttl_seconds(60);
        let cookie = session_cookie(&config, "tok").unwrap();
        let value = cookie.to_str().unwrap();
        assert!(value.starts_with("gardi_session=tok;"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("Max-Age=60"));
        assert!(!value.contains("Secure"));

        let secure = session_cookie(&config.clone().with_cookie_secure(true), "tok").unwrap();
        assert!(secure.to_str().unwrap().ends_with("; Secure"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie(&AuthConfig::new()).unwrap();
        assert!(cookie.to_str().unwrap().contains("Max-Age=0"));
    }

    #[test]
    fn extract_token_prefers_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(COOKIE, HeaderValue::from_static("gardi_session=def"));
        assert_eq!(extract_session_token(&headers), Some("abc".to_string()));
    }

    #[test]
    fn extract_token_reads_cookie_pairs() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; gardi_session=tok123; lang=eo"),
        );
        assert_eq!(extract_session_token(&headers), Some("tok123".to_string()));
    }

    #[test]
    fn extract_token_rejects_empty_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_session_token(&headers), None);
    }

    #[test]
    fn extract_token_none_without_headers() {
        assert_eq!(extract_session_token(&HeaderMap::new()), None);
    }
}
