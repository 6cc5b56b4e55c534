//! User registration, lookup, and password change.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::{info, warn};

use miniblog_core::error::AppError;
use miniblog_entity::user::CreateUser;

use crate::dto::request::{ChangePasswordRequest, CreateUserRequest};
use crate::dto::response::UserResponse;
use crate::error::ApiError;
use crate::extractors::{AuthUser, ValidatedJson};
use crate::state::AppState;

/// Methods a user may call on their own resources.
pub const OWNER_ACTIONS: &str = "(GET)|(POST)|(PUT)|(DELETE)";

/// Object patterns a user owns: their resource and everything below it.
pub fn owner_objects(username: &str) -> [String; 2] {
    [
        format!("/v1/users/{username}"),
        format!("/v1/users/{username}/*"),
    ]
}

fn check_password_length(state: &AppState, password: &str) -> Result<(), AppError> {
    let min = state.config.auth.password_min_length;
    if password.chars().count() < min {
        return Err(AppError::validation(format!(
            "Password must be at least {min} characters"
        )));
    }
    Ok(())
}

/// POST /v1/users
///
/// Stores the user, then grants them full access to their own resources.
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    check_password_length(&state, &req.password)?;

    let password_hash = state.hasher.hash(&req.password)?;
    let user = state
        .users
        .create(&CreateUser {
            username: req.username,
            password_hash,
            nickname: req.nickname,
            email: req.email,
            phone: req.phone,
        })
        .await?;

    for object in owner_objects(&user.username) {
        state
            .policy
            .add_rule(&user.username, &object, OWNER_ACTIONS)
            .await?;
    }

    info!(username = %user.username, "User registered");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// GET /v1/users/{name}
pub async fn get_user(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .users
        .find_by_username(&name)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User '{name}' not found")))?;

    Ok(Json(UserResponse::from(user)))
}

/// PUT /v1/users/{name}/change-password
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(name): Path<String>,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    check_password_length(&state, &req.new_password)?;

    let user = state
        .users
        .find_by_username(&name)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User '{name}' not found")))?;

    if !state.hasher.verify(&req.old_password, &user.password_hash) {
        warn!(caller = %auth.username(), user = %name, "Password change with wrong current password");
        return Err(AppError::authentication("Current password is incorrect")
            .with_code("AuthFailure.PasswordIncorrect")
            .into());
    }

    let password_hash = state.hasher.hash(&req.new_password)?;
    state.users.update_password(&name, &password_hash).await?;

    info!(caller = %auth.username(), user = %name, "Password changed");
    Ok(StatusCode::NO_CONTENT)
}
