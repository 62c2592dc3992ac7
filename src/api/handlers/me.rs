//! Authenticated self-service endpoints.
//!
//! Flow Overview:
//! 1) Authenticate via bearer token or session cookie.
//! 2) Resolve the current account from the durable store.
//!
//! Session listing reads the durable store only; whatever the cache
//! still holds for an expired or revoked session never shows up here.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tracing::error;
use utoipa::ToSchema;

use super::auth::principal::require_auth;
use super::auth::SessionCache;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub created_at: String,
    pub last_login: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionSummary {
    pub id: i64,
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
    pub location: Option<String>,
    pub created_at: String,
    pub last_activity: String,
    pub expires_at: String,
    /// True for the session that authorized this request.
    pub current_session: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummary>,
    pub total_active_sessions: usize,
}

#[utoipa::path(
    get,
    path = "/v1/me",
    responses(
        (status = 200, description = "Return the authenticated account.", body = MeResponse),
        (status = 401, description = "Missing or invalid session token."),
    ),
    tag = "me"
)]
pub async fn get_me(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    cache: Extension<SessionCache>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &cache).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    match fetch_account(&pool, principal.account_id).await {
        Ok(Some(account)) => (StatusCode::OK, Json(account)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to fetch account: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/me/sessions",
    responses(
        (status = 200, description = "Active sessions for the authenticated account.", body = SessionListResponse),
        (status = 401, description = "Missing or invalid session token."),
    ),
    tag = "me"
)]
pub async fn list_sessions(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    cache: Extension<SessionCache>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &cache).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    match fetch_sessions(&pool, principal.account_id, principal.session_id).await {
        Ok(sessions) => {
            let total_active_sessions = sessions.len();
            (
                StatusCode::OK,
                Json(SessionListResponse {
                    sessions,
                    total_active_sessions,
                }),
            )
                .into_response()
        }
        Err(err) => {
            error!("Failed to list sessions: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn fetch_account(pool: &PgPool, account_id: i64) -> Result<Option<MeResponse>, sqlx::Error> {
    let query = r#"
        SELECT
            id,
            email,
            username,
            full_name,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
            CASE
                WHEN last_login IS NULL THEN NULL
                ELSE to_char(last_login AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"')
            END AS last_login
        FROM accounts
        WHERE id = $1 AND is_active
        LIMIT 1
    "#;
    let row = sqlx::query(query)
        .bind(account_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|row| MeResponse {
        id: row.get("id"),
        email: row.get("email"),
        username: row.get("username"),
        full_name: row.get("full_name"),
        created_at: row.get("created_at"),
        last_login: row.get("last_login"),
    }))
}

async fn fetch_sessions(
    pool: &PgPool,
    account_id: i64,
    current_session_id: i64,
) -> Result<Vec<SessionSummary>, sqlx::Error> {
    let query = r#"
        SELECT
            id,
            device_info,
            ip_address,
            location,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
            to_char(last_activity AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS last_activity,
            to_char(expires_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS expires_at
        FROM sessions
        WHERE account_id = $1
          AND is_active
          AND expires_at > NOW()
        ORDER BY last_activity DESC
    "#;
    let rows = sqlx::query(query).bind(account_id).fetch_all(pool).await?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let id: i64 = row.get("id");
            SessionSummary {
                id,
                device_info: row.get("device_info"),
                ip_address: row.get("ip_address"),
                location: row.get("location"),
                created_at: row.get("created_at"),
                last_activity: row.get("last_activity"),
                expires_at: row.get("expires_at"),
                current_session: id == current_session_id,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn me_response_serializes_optional_last_login() {
        let me = MeResponse {
            id: 1,
            email: "alice@example.com".to_string(),
            username: "alice".to_string(),
            full_name: "Alice Example".to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            last_login: None,
        };
        let value = serde_json::to_value(&me).unwrap();
        assert!(value["last_login"].is_null());
    }

    #[test]
    fn session_list_counts_and_flags_current() {
        let summary = SessionSummary {
            id: 3,
            device_info: Some("test-agent/1.0".to_string()),
            ip_address: Some("1.2.3.4".to_string()),
            location: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            last_activity: "2026-01-01T01:00:00Z".to_string(),
            expires_at: "2026-01-02T00:00:00Z".to_string(),
            current_session: true,
        };
        let response = SessionListResponse {
            total_active_sessions: 1,
            sessions: vec![summary],
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["total_active_sessions"], 1);
        assert_eq!(value["sessions"][0]["current_session"], true);

        let decoded: SessionListResponse = serde_json::from_value(value).unwrap();
        assert_eq!(decoded.sessions[0].id, 3);
        assert_eq!(decoded.sessions[0].location, None);
    }
}
