//! Convenience result type alias for Miniblog.

use crate::error::AppError;

/// A specialized `Result` type for Miniblog operations.
pub type AppResult<T> = Result<T, AppError>;
