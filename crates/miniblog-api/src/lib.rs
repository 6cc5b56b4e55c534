//! # miniblog-api
//!
//! HTTP API layer for Miniblog built on Axum.
//!
//! Provides the public login and registration endpoints, the user
//! endpoints guarded by bearer-token authentication and policy
//! authorization, probes, error mapping, and server lifecycle.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, run_server};
pub use error::ApiError;
pub use state::AppState;
