//! Authentication and authorization error taxonomy.

use thiserror::Error;

use miniblog_core::error::{AppError, ErrorKind};

/// Failures raised by token handling and the policy engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No bearer credential on the request.
    #[error("missing bearer credential")]
    MissingCredential,
    /// Signature, algorithm, or structure mismatch.
    #[error("invalid token: {0}")]
    TokenInvalid(String),
    /// Outside the `[nbf, exp)` window.
    #[error("token has expired or is not yet valid")]
    TokenExpired,
    /// The signer failed while issuing a token.
    #[error("failed to sign token: {0}")]
    SigningError(String),
    /// Rejected signing configuration (empty key, reserved claim name).
    #[error("invalid signing configuration: {0}")]
    InvalidSigningConfig(String),
    /// Malformed model definition or unreachable policy store.
    #[error("failed to load policy: {0}")]
    PolicyLoadError(String),
    /// A matcher could not decide a request.
    #[error("policy evaluation fault: {0}")]
    PolicyEvaluationFault(String),
}

impl AuthError {
    /// Machine-readable code surfaced in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredential => "AuthFailure.MissingCredential",
            Self::TokenInvalid(_) => "AuthFailure.TokenInvalid",
            Self::TokenExpired => "AuthFailure.TokenExpired",
            Self::SigningError(_) => "InternalError.SignToken",
            Self::InvalidSigningConfig(_) => "InternalError.SigningConfig",
            Self::PolicyLoadError(_) => "InternalError.PolicyLoad",
            Self::PolicyEvaluationFault(_) => "AuthFailure.Unauthorized",
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let kind = match err {
            AuthError::MissingCredential | AuthError::TokenInvalid(_) | AuthError::TokenExpired => {
                ErrorKind::Authentication
            }
            AuthError::PolicyEvaluationFault(_) => ErrorKind::Authorization,
            AuthError::SigningError(_) => ErrorKind::Internal,
            AuthError::InvalidSigningConfig(_) | AuthError::PolicyLoadError(_) => {
                ErrorKind::Configuration
            }
        };
        let code = err.code();
        AppError::with_source(kind, err.to_string(), err).with_code(code)
    }
}
