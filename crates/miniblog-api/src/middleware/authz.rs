//! Policy authorization middleware.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use miniblog_auth::{AuthError, Authorizer};
use miniblog_core::error::AppError;

use super::authn::Identity;
use crate::error::ApiError;

/// Asks the authorizer whether the authenticated identity may perform the
/// request's method on its path.
///
/// Must run after [`super::authenticate`]; a request without an
/// [`Identity`] is treated as unauthenticated.
pub async fn authorize(
    State(authorizer): State<Arc<dyn Authorizer>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let subject = request
        .extensions()
        .get::<Identity>()
        .cloned()
        .ok_or(AuthError::MissingCredential)?;

    let object = request.uri().path();
    let action = request.method().as_str();

    if !authorizer.authorize(subject.as_str(), object, action) {
        warn!(subject = %subject.as_str(), object, action, "Authorization denied");
        return Err(AppError::authorization(format!(
            "'{}' may not {action} {object}",
            subject.as_str()
        ))
        .with_code("AuthFailure.Unauthorized")
        .into());
    }

    Ok(next.run(request).await)
}
