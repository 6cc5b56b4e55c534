//! `AuthUser` extractor: the identity attached by the authentication middleware.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use miniblog_auth::AuthError;

use crate::error::ApiError;
use crate::middleware::Identity;

/// Authenticated caller, available in handlers mounted behind
/// [`crate::middleware::authenticate`].
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl AuthUser {
    /// The caller's identity string.
    pub fn username(&self) -> &str {
        self.0.as_str()
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| AuthError::MissingCredential.into())
    }
}
