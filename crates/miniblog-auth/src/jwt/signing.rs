//! Signing key and identity claim configuration.

use std::fmt;

use miniblog_core::config::AuthConfig;

use crate::error::AuthError;

/// Claim name used when none is configured.
pub const DEFAULT_IDENTITY_CLAIM: &str = "username";

const RESERVED_CLAIMS: [&str; 3] = ["iat", "nbf", "exp"];

/// HMAC key plus the claim that carries the caller's identity.
#[derive(Clone)]
pub struct SigningConfig {
    key: Vec<u8>,
    claim_name: String,
}

impl SigningConfig {
    /// Validates and builds a signing configuration.
    ///
    /// An empty key is rejected. An empty claim name falls back to
    /// [`DEFAULT_IDENTITY_CLAIM`].
    pub fn new(key: impl AsRef<[u8]>, claim_name: &str) -> Result<Self, AuthError> {
        let key = key.as_ref();
        if key.is_empty() {
            return Err(AuthError::InvalidSigningConfig(
                "signing key must not be empty".to_string(),
            ));
        }

        let claim_name = match claim_name.trim() {
            "" => DEFAULT_IDENTITY_CLAIM,
            name => name,
        };
        if RESERVED_CLAIMS.contains(&claim_name) {
            return Err(AuthError::InvalidSigningConfig(format!(
                "identity claim cannot be the reserved claim '{claim_name}'"
            )));
        }

        Ok(Self {
            key: key.to_vec(),
            claim_name: claim_name.to_string(),
        })
    }

    /// Builds from the `[auth]` configuration section.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        Self::new(config.jwt_secret.as_bytes(), &config.identity_claim)
    }

    /// Raw key bytes.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Name of the identity claim.
    pub fn claim_name(&self) -> &str {
        &self.claim_name
    }
}

impl fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningConfig")
            .field("key", &"****")
            .field("claim_name", &self.claim_name)
            .finish()
    }
}
