//! # miniblog-core
//!
//! Core crate for Miniblog. Contains configuration schemas, the
//! durable policy store abstraction, the policy rule value type,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other Miniblog crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
