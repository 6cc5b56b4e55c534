//! Authentication configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Upper bound on token lifetime; tokens cannot be revoked before expiry.
pub const MAX_TOKEN_TTL_MINUTES: u64 = 60;

/// Token signing and credential configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for token signing (HMAC-SHA256). Required, never defaulted.
    pub jwt_secret: String,
    /// Name of the claim carrying the identity inside a token.
    #[serde(default = "default_identity_claim")]
    pub identity_claim: String,
    /// Token lifetime in minutes.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_minutes: u64,
    /// Minimum password length accepted at registration.
    #[serde(default = "default_password_min")]
    pub password_min_length: usize,
}

impl AuthConfig {
    /// Rejects an empty signing key and unbounded token lifetimes.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.jwt_secret.is_empty() {
            return Err(AppError::configuration(
                "auth.jwt_secret must be a non-empty secret",
            ));
        }
        if self.token_ttl_minutes == 0 || self.token_ttl_minutes > MAX_TOKEN_TTL_MINUTES {
            return Err(AppError::configuration(format!(
                "auth.token_ttl_minutes must be between 1 and {MAX_TOKEN_TTL_MINUTES}"
            )));
        }
        Ok(())
    }
}

fn default_identity_claim() -> String {
    "username".to_string()
}

fn default_token_ttl() -> u64 {
    30
}

fn default_password_min() -> usize {
    6
}
