//! Auth state and configuration.

use std::sync::Arc;
use std::time::Duration;

use super::geo::GeoLocator;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_CACHE_OP_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_STORE_ACQUIRE_TIMEOUT_SECONDS: u64 = 5;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    session_ttl_seconds: i64,
    cache_op_timeout_ms: u64,
    store_acquire_timeout_seconds: u64,
    cookie_secure: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            cache_op_timeout_ms: DEFAULT_CACHE_OP_TIMEOUT_MS,
            store_acquire_timeout_seconds: DEFAULT_STORE_ACQUIRE_TIMEOUT_SECONDS,
            cookie_secure: false,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_cache_op_timeout_ms(mut self, millis: u64) -> Self {
        self.cache_op_timeout_ms = millis;
        self
    }

    #[must_use]
    pub fn with_store_acquire_timeout_seconds(mut self, seconds: u64) -> Self {
        self.store_acquire_timeout_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    pub(crate) fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    /// Cache TTL mirrors the session lifetime so a cache miss means
    /// expiry in the common case.
    pub(crate) fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds.max(0).unsigned_abs())
    }

    pub(crate) fn cache_op_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_op_timeout_ms)
    }

    pub(crate) fn store_acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.store_acquire_timeout_seconds)
    }

    pub(super) fn session_cookie_secure(&self) -> bool {
        self.cookie_secure
    }
}

pub struct AuthState {
    config: AuthConfig,
    geo: Arc<dyn GeoLocator>,
}

impl AuthState {
    pub fn new(config: AuthConfig, geo: Arc<dyn GeoLocator>) -> Self {
        Self { config, geo }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(crate) fn geo_locator(&self) -> &dyn GeoLocator {
        self.geo.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::super::geo::NoopGeoLocator;
    use super::{AuthConfig, AuthState};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new();

        assert_eq!(
            config.session_ttl_seconds(),
            super::DEFAULT_SESSION_TTL_SECONDS
        );
        assert_eq!(config.cache_op_timeout(), Duration::from_millis(2_000));
        assert_eq!(config.store_acquire_timeout(), Duration::from_secs(5));
        assert!(!config.session_cookie_secure());

        let config = config
            .with_session_ttl_seconds(60)
            .with_cache_op_timeout_ms(500)
            .with_store_acquire_timeout_seconds(1)
            .with_cookie_secure(true);

        assert_eq!(config.session_ttl_seconds(), 60);
        assert_eq!(config.session_ttl(), Duration::from_secs(60));
        assert_eq!(config.cache_op_timeout(), Duration::from_millis(500));
        assert_eq!(config.store_acquire_timeout(), Duration::from_secs(1));
        assert!(config.session_cookie_secure());
    }

    #[test]
    fn session_ttl_never_negative() {
        let config = AuthConfig::new().with_session_ttl_seconds(-1);
        assert_eq!(config.session_ttl(), Duration::from_secs(0));
    }

    #[test]
    fn auth_state_exposes_config() {
        let state = AuthState::new(
            AuthConfig::new().with_session_ttl_seconds(30),
            Arc::new(NoopGeoLocator),
        );
        assert_eq!(state.config().session_ttl_seconds(), 30);
        assert_eq!(state.geo_locator().locate(Some("1.2.3.4")), None);
    }
}
