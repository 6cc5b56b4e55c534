//! Bearer-token authentication middleware.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use miniblog_auth::{CredentialCarrier, TokenService};

use crate::error::ApiError;

/// Verified caller identity, attached to the request by [`authenticate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(pub String);

impl Identity {
    /// The identity string carried in the token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Exposes a request's `Authorization` header to the token service.
pub struct HeaderCarrier<'a>(pub &'a HeaderMap);

impl CredentialCarrier for HeaderCarrier<'_> {
    fn authorization(&self) -> Option<&str> {
        self.0.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
    }
}

/// Verifies the bearer token and attaches the caller's [`Identity`].
///
/// Requests without a valid token are answered with 401 and never reach
/// the inner service.
pub async fn authenticate(
    State(tokens): State<Arc<TokenService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = match tokens.verify_from_carrier(&HeaderCarrier(request.headers())) {
        Ok(identity) => identity,
        Err(e) => {
            warn!(path = %request.uri().path(), error = %e, "Authentication failed");
            return Err(e.into());
        }
    };

    request.extensions_mut().insert(Identity(identity));
    Ok(next.run(request).await)
}
