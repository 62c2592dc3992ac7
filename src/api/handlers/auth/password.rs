//! Password hashing and verification.
//!
//! bcrypt recomputes the stored hash and compares digests; runtime
//! depends on the cost factor, not on where the inputs differ. The
//! work is CPU-bound, so both operations run on the blocking pool.

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};

pub(super) async fn hash_password(password: SecretString) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        bcrypt::hash(password.expose_secret(), bcrypt::DEFAULT_COST)
    })
    .await
    .context("password hashing task failed")?
    .context("failed to hash password")
}

pub(super) async fn verify_password(password: SecretString, password_hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password.expose_secret(), &password_hash))
        .await
        .context("password verification task failed")?
        .context("failed to verify password")
}

#[cfg(test)]
mod tests {
    use super::*;

    // Low cost keeps the test fast; production paths use DEFAULT_COST.
    fn test_hash(password: &str) -> String {
        bcrypt::hash(password, 4).unwrap()
    }

    #[tokio::test]
    async fn verify_accepts_matching_password() {
        let hash = test_hash("password123");
        let verified = verify_password(SecretString::from("password123"), hash)
            .await
            .unwrap();
        assert!(verified);
    }

    #[tokio::test]
    async fn verify_rejects_wrong_password() {
        let hash = test_hash("password123");
        let verified = verify_password(SecretString::from("wrongpass"), hash)
            .await
            .unwrap();
        assert!(!verified);
    }

    #[tokio::test]
    async fn verify_errors_on_malformed_hash() {
        let result =
            verify_password(SecretString::from("password123"), "not-a-hash".to_string()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn hash_then_verify_round_trip() {
        let hash = hash_password(SecretString::from("correct horse")).await.unwrap();
        let verified = verify_password(SecretString::from("correct horse"), hash)
            .await
            .unwrap();
        assert!(verified);
    }
}
