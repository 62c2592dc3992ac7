//! Password authentication with per-account lockout.
//!
//! Lockout policy: five failed attempts within fifteen minutes lock
//! the account. The gate runs before any password comparison and
//! mutates nothing. Once the window has elapsed the counter is treated
//! as reset without a persisted write: a failure right after an
//! elapsed window records a counter of 1, not 6, and a success defers
//! the persisted reset to the session-creation transaction so lockout
//! state and session state move together.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use secrecy::SecretString;
use sqlx::PgPool;
use std::time::Duration;

use super::password::verify_password;
use super::storage;
use super::utils::normalize_email;

pub(crate) const MAX_FAILED_ATTEMPTS: i32 = 5;
pub(crate) const LOCKOUT_COOLDOWN_SECONDS: i64 = 15 * 60;

/// Account fields exposed to callers after a successful verification.
pub(crate) struct Account {
    pub(crate) id: i64,
    pub(crate) email: String,
    pub(crate) username: String,
    pub(crate) full_name: String,
}

pub(crate) enum AuthOutcome {
    Authenticated(Account),
    InvalidCredentials,
    LockedOut { retry_after: Duration },
    /// Unknown or inactive account. Callers must surface this exactly
    /// like `InvalidCredentials` to avoid account enumeration.
    NotFound,
}

#[derive(Debug, PartialEq, Eq)]
enum LockoutState {
    Locked,
    WindowElapsed,
    Clear,
}

fn lockout_state(
    failed_attempts: i32,
    last_failed: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> LockoutState {
    if failed_attempts < MAX_FAILED_ATTEMPTS {
        return LockoutState::Clear;
    }
    match last_failed {
        Some(at)
            if now.signed_duration_since(at)
                < ChronoDuration::seconds(LOCKOUT_COOLDOWN_SECONDS) =>
        {
            LockoutState::Locked
        }
        Some(_) => LockoutState::WindowElapsed,
        // Counter and timestamp always move together; a missing
        // timestamp means the counter was already reset.
        None => LockoutState::Clear,
    }
}

/// The counter restarts at 1 after an elapsed window, preventing a
/// single failure from re-arming the lockout permanently.
fn next_failed_count(failed_attempts: i32, lockout: &LockoutState) -> i32 {
    match lockout {
        LockoutState::WindowElapsed => 1,
        _ => failed_attempts + 1,
    }
}

pub(crate) async fn authenticate(
    pool: &PgPool,
    email: &str,
    password: &SecretString,
) -> Result<AuthOutcome> {
    let email = normalize_email(email);

    // The account row stays locked for the whole attempt so two
    // concurrent failures cannot lose a counter update.
    let mut tx = pool
        .begin()
        .await
        .context("begin authentication transaction")?;

    let Some(account) = storage::lookup_account_for_update(&mut tx, &email).await? else {
        let _ = tx.rollback().await;
        return Ok(AuthOutcome::NotFound);
    };

    let lockout = lockout_state(
        account.failed_login_attempts,
        account.last_failed_attempt,
        Utc::now(),
    );
    if lockout == LockoutState::Locked {
        // Rejected before any password comparison; nothing persisted.
        let _ = tx.rollback().await;
        return Ok(AuthOutcome::LockedOut {
            retry_after: Duration::from_secs(LOCKOUT_COOLDOWN_SECONDS.unsigned_abs()),
        });
    }

    let verified = verify_password(password.clone(), account.password_hash.clone()).await?;

    if !verified {
        let count = next_failed_count(account.failed_login_attempts, &lockout);
        storage::persist_failed_attempt(&mut tx, account.id, count).await?;
        // The failed-attempt write survives the rejected login.
        tx.commit().await.context("commit failed-attempt update")?;
        return Ok(AuthOutcome::InvalidCredentials);
    }

    // Success-side reset is deferred to the session-creation
    // transaction (see session::create_session).
    tx.commit().await.context("commit authentication read")?;

    Ok(AuthOutcome::Authenticated(Account {
        id: account.id,
        email: account.email,
        username: account.username,
        full_name: account.full_name,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes_ago(now: DateTime<Utc>, minutes: i64) -> Option<DateTime<Utc>> {
        Some(now - ChronoDuration::minutes(minutes))
    }

    #[test]
    fn below_threshold_never_locks() {
        let now = Utc::now();
        for attempts in 0..MAX_FAILED_ATTEMPTS {
            assert_eq!(
                lockout_state(attempts, minutes_ago(now, 1), now),
                LockoutState::Clear
            );
        }
    }

    #[test]
    fn threshold_within_window_locks() {
        let now = Utc::now();
        assert_eq!(
            lockout_state(MAX_FAILED_ATTEMPTS, minutes_ago(now, 1), now),
            LockoutState::Locked
        );
        assert_eq!(
            lockout_state(MAX_FAILED_ATTEMPTS + 3, minutes_ago(now, 14), now),
            LockoutState::Locked
        );
    }

    #[test]
    fn threshold_after_window_treats_counter_as_reset() {
        let now = Utc::now();
        assert_eq!(
            lockout_state(MAX_FAILED_ATTEMPTS, minutes_ago(now, 16), now),
            LockoutState::WindowElapsed
        );
    }

    #[test]
    fn exactly_at_window_boundary_is_elapsed() {
        let now = Utc::now();
        let boundary = Some(now - ChronoDuration::seconds(LOCKOUT_COOLDOWN_SECONDS));
        assert_eq!(
            lockout_state(MAX_FAILED_ATTEMPTS, boundary, now),
            LockoutState::WindowElapsed
        );
    }

    #[test]
    fn high_counter_without_timestamp_is_clear() {
        let now = Utc::now();
        assert_eq!(
            lockout_state(MAX_FAILED_ATTEMPTS, None, now),
            LockoutState::Clear
        );
    }

    #[test]
    fn failure_after_elapsed_window_restarts_at_one() {
        assert_eq!(
            next_failed_count(MAX_FAILED_ATTEMPTS, &LockoutState::WindowElapsed),
            1
        );
    }

    #[test]
    fn failure_below_threshold_increments() {
        assert_eq!(next_failed_count(0, &LockoutState::Clear), 1);
        assert_eq!(next_failed_count(3, &LockoutState::Clear), 4);
    }

    #[test]
    fn locked_out_carries_fixed_cooldown() {
        let retry_after = Duration::from_secs(LOCKOUT_COOLDOWN_SECONDS.unsigned_abs());
        assert_eq!(retry_after, Duration::from_secs(15 * 60));
    }
}
