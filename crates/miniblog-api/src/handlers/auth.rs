//! Login handler.

use axum::Json;
use axum::extract::State;
use chrono::Utc;
use tracing::info;

use miniblog_core::error::AppError;

use crate::dto::request::LoginRequest;
use crate::dto::response::LoginResponse;
use crate::error::ApiError;
use crate::extractors::ValidatedJson;
use crate::state::AppState;

const BAD_CREDENTIALS: &str = "Incorrect username or password";

/// POST /login
///
/// An unknown user and a wrong password are reported identically.
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .users
        .find_by_username(&req.username)
        .await?
        .ok_or_else(|| {
            AppError::authentication(BAD_CREDENTIALS).with_code("AuthFailure.PasswordIncorrect")
        })?;

    if !state.hasher.verify(&req.password, &user.password_hash) {
        return Err(AppError::authentication(BAD_CREDENTIALS)
            .with_code("AuthFailure.PasswordIncorrect")
            .into());
    }

    let token = state.tokens.issue(&user.username)?;
    let ttl = chrono::Duration::from_std(state.tokens.ttl()).unwrap_or_else(|_| chrono::Duration::zero());
    let expire_at = Utc::now() + ttl;

    info!(username = %user.username, "User logged in");
    Ok(Json(LoginResponse { token, expire_at }))
}
