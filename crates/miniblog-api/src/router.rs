//! Route definitions for the Miniblog HTTP API.
//!
//! Public routes (probes, login, registration) are mounted directly. User
//! resource routes sit behind authentication, then authorization.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};

use miniblog_auth::{Authorizer, TokenService};

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete router with all routes and request logging.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(public_routes())
        .merge(protect(
            user_routes(),
            Arc::clone(&state.tokens),
            Arc::clone(&state.authorizer),
        ))
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Wraps `routes` so every request is authenticated, then authorized.
///
/// Layers apply only to matched routes; unknown paths still 404.
pub fn protect<S>(
    routes: Router<S>,
    tokens: Arc<TokenService>,
    authorizer: Arc<dyn Authorizer>,
) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    routes
        .route_layer(axum_middleware::from_fn_with_state(
            authorizer,
            middleware::authorize,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            tokens,
            middleware::authenticate,
        ))
}

/// Probes, login, and registration.
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(handlers::health::healthz))
        .route("/readyz", get(handlers::health::readyz))
        .route("/login", post(handlers::auth::login))
        .route("/v1/users", post(handlers::user::create_user))
}

/// A user's own resources.
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/users/{name}", get(handlers::user::get_user))
        .route(
            "/v1/users/{name}/change-password",
            put(handlers::user::change_password),
        )
}
