//! Axum middleware stack.

pub mod authn;
pub mod authz;
pub mod cors;
pub mod logging;

pub use authn::{HeaderCarrier, Identity, authenticate};
pub use authz::authorize;
