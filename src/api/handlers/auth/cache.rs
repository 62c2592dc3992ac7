//! Session cache: token hash → account id with a TTL.
//!
//! The cache is the fast-path access gate, never the system of record.
//! Every command runs under a bounded timeout; a timeout is an error so
//! callers fail closed instead of defaulting to allow.

use anyhow::{anyhow, Context, Result};
use base64::Engine;
use redis::{aio::MultiplexedConnection, AsyncCommands};
use std::future::Future;
use std::time::Duration;

#[derive(Clone)]
pub struct SessionCache {
    conn: MultiplexedConnection,
    op_timeout: Duration,
}

impl SessionCache {
    pub async fn connect(url: &str, op_timeout: Duration) -> Result<Self> {
        let client = redis::Client::open(url).context("invalid session cache URL")?;
        let conn = client
            .get_multiplexed_tokio_connection()
            .await
            .context("failed to connect to session cache")?;
        Ok(Self { conn, op_timeout })
    }

    pub(crate) async fn put(&self, token_hash: &[u8], account_id: i64, ttl: Duration) -> Result<()> {
        let key = cache_key(token_hash);
        let mut conn = self.conn.clone();
        self.bounded(async move {
            conn.set_ex::<_, _, ()>(key, account_id, ttl.as_secs())
                .await
        })
        .await
        .context("failed to write session to cache")
    }

    pub(crate) async fn get(&self, token_hash: &[u8]) -> Result<Option<i64>> {
        let key = cache_key(token_hash);
        let mut conn = self.conn.clone();
        self.bounded(async move { conn.get::<_, Option<i64>>(key).await })
            .await
            .context("failed to read session from cache")
    }

    pub(crate) async fn evict(&self, token_hash: &[u8]) -> Result<()> {
        let key = cache_key(token_hash);
        let mut conn = self.conn.clone();
        self.bounded(async move { conn.del::<_, ()>(key).await })
            .await
            .context("failed to delete session from cache")
    }

    pub(crate) async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        self.bounded(async move {
            redis::cmd("PING")
                .query_async::<_, String>(&mut conn)
                .await
        })
        .await
        .map(|_| ())
        .context("failed to ping session cache")
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(anyhow::Error::from),
            Err(_) => Err(anyhow!(
                "cache command timed out after {:?}",
                self.op_timeout
            )),
        }
    }
}

fn cache_key(token_hash: &[u8]) -> String {
    format!(
        "session:{}",
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(token_hash)
    )
}

#[cfg(test)]
mod tests {
    use super::cache_key;

    #[test]
    fn cache_key_is_namespaced_and_stable() {
        let hash = [7u8; 32];
        let first = cache_key(&hash);
        let second = cache_key(&hash);
        assert!(first.starts_with("session:"));
        assert_eq!(first, second);
        // Raw hash bytes never appear in the keyspace.
        assert!(!first.contains('\u{7}'));
    }

    #[test]
    fn cache_key_differs_per_token() {
        assert_ne!(cache_key(&[1u8; 32]), cache_key(&[2u8; 32]));
    }
}
