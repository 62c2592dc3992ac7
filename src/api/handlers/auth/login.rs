//! Login endpoint: password authentication followed by session issue.
//!
//! Unknown accounts and wrong passwords produce the same response, so
//! the endpoint cannot be used to enumerate emails. Lockout is the one
//! distinguishable rejection and carries a `Retry-After` header.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::authenticator::{authenticate, AuthOutcome};
use super::cache::SessionCache;
use super::session::{create_session, session_cookie, ClientMetadata};
use super::state::AuthState;
use super::types::{AccountInfo, LockedResponse, LoginRequest, LoginResponse};
use super::utils::extract_client_ip;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

fn client_metadata(headers: &HeaderMap, state: &AuthState) -> ClientMetadata {
    let ip_address = extract_client_ip(headers);
    let location = state.geo_locator().locate(ip_address.as_deref());
    let device_info = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    ClientMetadata {
        device_info,
        ip_address,
        location,
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated; session token issued", body = LoginResponse),
        (status = 400, description = "Missing email or password", body = String),
        (status = 401, description = "Unknown account or wrong password", body = String),
        (status = 429, description = "Account temporarily locked", body = LockedResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    cache: Extension<SessionCache>,
    auth_state: Extension<Arc<AuthState>>,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    if payload.email.trim().is_empty() || payload.password.expose_secret().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            "Email and password are required".to_string(),
        )
            .into_response();
    }

    let account = match authenticate(&pool, &payload.email, &payload.password).await {
        Ok(AuthOutcome::Authenticated(account)) => account,
        Ok(AuthOutcome::InvalidCredentials | AuthOutcome::NotFound) => {
            return (StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS.to_string()).into_response();
        }
        Ok(AuthOutcome::LockedOut { retry_after }) => {
            warn!("Login rejected by lockout policy");
            let mut response_headers = HeaderMap::new();
            if let Ok(value) = retry_after.as_secs().to_string().parse() {
                response_headers.insert(axum::http::header::RETRY_AFTER, value);
            }
            return (
                StatusCode::TOO_MANY_REQUESTS,
                response_headers,
                Json(LockedResponse {
                    error: "Account temporarily locked".to_string(),
                    retry_after_seconds: retry_after.as_secs(),
                }),
            )
                .into_response();
        }
        Err(err) => {
            error!("Failed to authenticate: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let metadata = client_metadata(&headers, &auth_state);

    match create_session(&pool, &cache, auth_state.config(), account.id, &metadata).await {
        Ok(session) => {
            info!(account_id = account.id, "Session created");
            let mut response_headers = HeaderMap::new();
            if let Ok(cookie) = session_cookie(auth_state.config(), &session.token) {
                response_headers.insert(SET_COOKIE, cookie);
            }
            (
                StatusCode::OK,
                response_headers,
                Json(LoginResponse {
                    token: session.token,
                    expires_at: session.expires_at.to_rfc3339(),
                    account: AccountInfo {
                        id: account.id,
                        email: account.email,
                        username: account.username,
                        full_name: account.full_name,
                    },
                }),
            )
                .into_response()
        }
        Err(err) => {
            error!("Failed to create session: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::geo::NoopGeoLocator;
    use super::super::state::AuthConfig;
    use axum::http::HeaderValue;

    #[test]
    fn client_metadata_collects_headers() {
        let state = AuthState::new(AuthConfig::new(), Arc::new(NoopGeoLocator));
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::USER_AGENT,
            HeaderValue::from_static("test-agent/1.0"),
        );
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.2.3.4"));

        let metadata = client_metadata(&headers, &state);
        assert_eq!(metadata.device_info.as_deref(), Some("test-agent/1.0"));
        assert_eq!(metadata.ip_address.as_deref(), Some("1.2.3.4"));
        assert_eq!(metadata.location, None);
    }

    #[test]
    fn client_metadata_empty_without_headers() {
        let state = AuthState::new(AuthConfig::new(), Arc::new(NoopGeoLocator));
        let metadata = client_metadata(&HeaderMap::new(), &state);
        assert_eq!(metadata.device_info, None);
        assert_eq!(metadata.ip_address, None);
    }
}
