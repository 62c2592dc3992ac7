//! API handlers for gardi.
//!
//! This module organizes the service's route handlers: account
//! registration and login, session logout, the authenticated `/v1/me`
//! surface, and health reporting.

pub mod auth;
pub mod health;
pub mod me;
pub mod root;
