//! Auth handlers and supporting modules.
//!
//! This module coordinates password authentication, session issue and
//! revocation, and the request guard used by protected endpoints.
//!
//! ## Session Stores
//!
//! Sessions are recorded in two places with distinct roles:
//!
//! - **Durable store (`PostgreSQL`):** the authority on whether a
//!   session was ever issued and whether it is still active.
//! - **Cache (`Redis`):** a TTL-keyed accelerator consulted first on
//!   every request. A cache miss denies access outright, so losing the
//!   cache logs everyone out rather than letting anyone in.
//!
//! ## Lockout
//!
//! Five failed password attempts within fifteen minutes lock the
//! account for fifteen minutes. The check runs before any password
//! comparison.

pub(crate) mod authenticator;
pub(crate) mod cache;
pub(crate) mod geo;
pub(crate) mod login;
mod password;
pub(crate) mod principal;
pub(crate) mod register;
pub(crate) mod session;
mod state;
mod storage;
pub(crate) mod types;
mod utils;

pub use cache::SessionCache;
pub use geo::{GeoLocator, NoopGeoLocator};
pub use state::{AuthConfig, AuthState};
