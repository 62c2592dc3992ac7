//! Request/response types for auth endpoints.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    #[schema(value_type = String)]
    pub password: SecretString,
    pub full_name: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    #[schema(value_type = String)]
    pub password: SecretString,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AccountInfo {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub full_name: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: String,
    pub account: AccountInfo,
}

/// Body for lockout rejections, alongside a `Retry-After` header.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LockedResponse {
    pub error: String,
    pub retry_after_seconds: u64,
}
