//! Database helpers for accounts and sessions.
//!
//! Only the Session Manager mutates session rows; the Request Guard
//! reads through `lookup_live_session` and the best-effort
//! `touch_session`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::Instrument;

use super::session::ClientMetadata;

/// Outcome when attempting to create a new account.
#[derive(Debug)]
pub(super) enum RegisterOutcome {
    Created {
        id: i64,
        email: String,
        username: String,
    },
    Conflict,
}

/// Fields needed to authenticate and to apply lockout policy.
pub(super) struct AccountRow {
    pub(super) id: i64,
    pub(super) email: String,
    pub(super) username: String,
    pub(super) full_name: String,
    pub(super) password_hash: String,
    pub(super) failed_login_attempts: i32,
    pub(super) last_failed_attempt: Option<DateTime<Utc>>,
}

/// A session row that is active and unexpired in the durable store.
pub(super) struct LiveSession {
    pub(super) id: i64,
    pub(super) account_id: i64,
}

pub(super) async fn insert_account(
    pool: &PgPool,
    email: &str,
    username: &str,
    password_hash: &str,
    full_name: &str,
) -> Result<RegisterOutcome> {
    let query = r"
        INSERT INTO accounts (email, username, password_hash, full_name)
        VALUES ($1, $2, $3, $4)
        RETURNING id, email, username
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(username)
        .bind(password_hash)
        .bind(full_name)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(RegisterOutcome::Created {
            id: row.get("id"),
            email: row.get("email"),
            username: row.get("username"),
        }),
        Err(err) if super::utils::is_unique_violation(&err) => Ok(RegisterOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert account"),
    }
}

/// Look up an active account by (normalized) email, locking the row
/// for the duration of the transaction so concurrent failed attempts
/// cannot lose counter updates. Inactive accounts are indistinguishable
/// from missing ones.
pub(super) async fn lookup_account_for_update(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    email: &str,
) -> Result<Option<AccountRow>> {
    let query = r"
        SELECT id, email, username, full_name, password_hash,
               failed_login_attempts, last_failed_attempt
        FROM accounts
        WHERE email = $1 AND is_active
        FOR UPDATE
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(&mut **tx)
        .instrument(span)
        .await
        .context("failed to lookup account")?;

    Ok(row.map(|row| AccountRow {
        id: row.get("id"),
        email: row.get("email"),
        username: row.get("username"),
        full_name: row.get("full_name"),
        password_hash: row.get("password_hash"),
        failed_login_attempts: row.get("failed_login_attempts"),
        last_failed_attempt: row.get("last_failed_attempt"),
    }))
}

/// Persist a failed attempt: counter and timestamp always move
/// together.
pub(super) async fn persist_failed_attempt(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    account_id: i64,
    failed_attempts: i32,
) -> Result<()> {
    let query = r"
        UPDATE accounts
        SET failed_login_attempts = $2,
            last_failed_attempt = NOW(),
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(account_id)
        .bind(failed_attempts)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to persist failed attempt")?;
    Ok(())
}

/// Success-side account update: clear lockout state and stamp the
/// login, in the same transaction that inserts the session.
pub(super) async fn reset_login_state(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    account_id: i64,
) -> Result<()> {
    let query = r"
        UPDATE accounts
        SET failed_login_attempts = 0,
            last_failed_attempt = NULL,
            last_login = NOW(),
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(account_id)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to reset login state")?;
    Ok(())
}

/// Insert a session row. Returns the raw `sqlx::Error` so the caller
/// can retry on a token-hash unique violation.
pub(super) async fn insert_session_row(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    account_id: i64,
    token_hash: &[u8],
    metadata: &ClientMetadata,
    ttl_seconds: i64,
) -> std::result::Result<(i64, DateTime<Utc>), sqlx::Error> {
    let query = r"
        INSERT INTO sessions
            (account_id, token_hash, device_info, ip_address, location, expires_at)
        VALUES ($1, $2, $3, $4, $5, NOW() + ($6 * INTERVAL '1 second'))
        RETURNING id, expires_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(account_id)
        .bind(token_hash)
        .bind(metadata.device_info.as_deref())
        .bind(metadata.ip_address.as_deref())
        .bind(metadata.location.as_deref())
        .bind(ttl_seconds)
        .fetch_one(&mut **tx)
        .instrument(span)
        .await?;

    Ok((row.get("id"), row.get("expires_at")))
}

/// Durable-store usability check: the row must exist, be active, and
/// be unexpired.
pub(super) async fn lookup_live_session(
    pool: &PgPool,
    token_hash: &[u8],
) -> Result<Option<LiveSession>> {
    let query = r"
        SELECT id, account_id
        FROM sessions
        WHERE token_hash = $1
          AND is_active
          AND expires_at > NOW()
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup session")?;

    Ok(row.map(|row| LiveSession {
        id: row.get("id"),
        account_id: row.get("account_id"),
    }))
}

/// Record activity for audit/visibility without extending the session.
pub(super) async fn touch_session(pool: &PgPool, session_id: i64) -> Result<()> {
    let query = r"
        UPDATE sessions
        SET last_activity = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(session_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update session last_activity")?;
    Ok(())
}

/// Conditional revoke: only a currently-active row is touched, so of
/// two concurrent revokes exactly one reports a row.
pub(super) async fn deactivate_session<'e, E>(executor: E, token_hash: &[u8]) -> Result<u64>
where
    E: sqlx::PgExecutor<'e>,
{
    let query = r"
        UPDATE sessions
        SET is_active = FALSE,
            expires_at = NOW()
        WHERE token_hash = $1 AND is_active
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(token_hash)
        .execute(executor)
        .instrument(span)
        .await
        .context("failed to deactivate session")?;
    Ok(result.rows_affected())
}
