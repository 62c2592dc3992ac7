//! # Gardi (Credential & Session Service)
//!
//! `gardi` authenticates accounts by password, issues opaque session
//! tokens, and tracks active sessions across two backing stores: the
//! authoritative Postgres record and a TTL-based cache used for
//! fast-path validation.
//!
//! ## Dual-store protocol
//!
//! The cache is an accelerator, never an authority. A cache miss is a
//! conclusive deny; a cache hit is provisional and must be confirmed
//! against the durable store before access is granted. Divergence is
//! tolerated only in the restrictive direction: the cache may claim a
//! session is dead while the store still shows it live, never the
//! reverse. Reads that detect a stale cache entry evict it.
//!
//! ## Lockout
//!
//! Five failed attempts within fifteen minutes lock an account. The
//! lockout gate runs before any password comparison and mutates
//! nothing; the failed-attempt counter is only persisted on a failed
//! verification, and only reset inside the session-creation
//! transaction of the next successful login.

pub mod api;
pub mod cli;
