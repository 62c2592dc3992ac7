//! Account registration endpoint.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use tracing::error;

use super::password::hash_password;
use super::storage::{self, RegisterOutcome};
use super::types::{RegisterRequest, RegisterResponse};
use super::utils::{normalize_email, valid_email};

const MIN_PASSWORD_LENGTH: usize = 8;
const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 50;

fn validate(request: &RegisterRequest, email: &str) -> Result<(), &'static str> {
    if !valid_email(email) {
        return Err("Invalid email address");
    }
    let username = request.username.trim();
    if username.len() < MIN_USERNAME_LENGTH || username.len() > MAX_USERNAME_LENGTH {
        return Err("Username must be between 3 and 50 characters");
    }
    if request.password.expose_secret().len() < MIN_PASSWORD_LENGTH {
        return Err("Password must be at least 8 characters");
    }
    if request.full_name.trim().is_empty() {
        return Err("Full name is required");
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Invalid registration payload", body = String),
        (status = 409, description = "Email or username already taken", body = String)
    ),
    tag = "auth"
)]
pub async fn register(
    pool: Extension<PgPool>,
    Json(payload): Json<RegisterRequest>,
) -> impl IntoResponse {
    let email = normalize_email(&payload.email);

    if let Err(message) = validate(&payload, &email) {
        return (StatusCode::BAD_REQUEST, message.to_string()).into_response();
    }

    let password_hash = match hash_password(payload.password.clone()).await {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match storage::insert_account(
        &pool,
        &email,
        payload.username.trim(),
        &password_hash,
        payload.full_name.trim(),
    )
    .await
    {
        Ok(RegisterOutcome::Created {
            id,
            email,
            username,
        }) => (
            StatusCode::CREATED,
            Json(RegisterResponse {
                id,
                email,
                username,
            }),
        )
            .into_response(),
        Ok(RegisterOutcome::Conflict) => (
            StatusCode::CONFLICT,
            "Email or username already taken".to_string(),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to create account: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
