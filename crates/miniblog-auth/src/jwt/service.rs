//! Token issuance and verification.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{debug, warn};

use miniblog_core::config::AuthConfig;

use super::carrier::{CredentialCarrier, bearer_token};
use super::claims::Claims;
use super::clock::{Clock, SystemClock};
use super::signing::{DEFAULT_IDENTITY_CLAIM, SigningConfig};
use crate::error::AuthError;

/// Lifetime of an issued token when none is configured.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// Issues and verifies identity tokens.
///
/// Signing configuration is set once, either at construction or through
/// [`TokenService::initialize`], and is immutable afterwards.
#[derive(Debug)]
pub struct TokenService {
    signing: OnceLock<SigningConfig>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    /// Creates a service that is already initialized with `signing`.
    pub fn new(signing: SigningConfig) -> Self {
        let service = Self::uninitialized();
        let _ = service.signing.set(signing);
        service
    }

    /// Creates a service with no signing configuration yet.
    pub fn uninitialized() -> Self {
        Self {
            signing: OnceLock::new(),
            ttl: DEFAULT_TOKEN_TTL,
            clock: Arc::new(SystemClock),
        }
    }

    /// Builds an initialized service from the `[auth]` section.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let signing = SigningConfig::from_config(config)?;
        Ok(Self::new(signing).with_ttl(Duration::from_secs(config.token_ttl_minutes * 60)))
    }

    /// Overrides the token lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Overrides the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the signing key and identity claim name. Only the first call
    /// takes effect.
    ///
    /// Returns `Ok(true)` if this call applied the configuration and
    /// `Ok(false)` if the service was already initialized. An empty key on
    /// an uninitialized service is an error.
    pub fn initialize(&self, key: impl AsRef<[u8]>, claim_name: &str) -> Result<bool, AuthError> {
        if self.signing.get().is_some() {
            return Ok(false);
        }
        let config = SigningConfig::new(key, claim_name)?;
        Ok(self.signing.set(config).is_ok())
    }

    /// Whether a signing configuration is in place.
    pub fn is_initialized(&self) -> bool {
        self.signing.get().is_some()
    }

    /// Name of the identity claim, falling back to the default before initialization.
    pub fn claim_name(&self) -> &str {
        self.signing
            .get()
            .map_or(DEFAULT_IDENTITY_CLAIM, SigningConfig::claim_name)
    }

    /// Configured token lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues an HS256 token for `identity`, valid from now for the configured lifetime.
    pub fn issue(&self, identity: &str) -> Result<String, AuthError> {
        let signing = self.signing.get().ok_or_else(|| {
            AuthError::SigningError("token service is not initialized".to_string())
        })?;

        let ttl = i64::try_from(self.ttl.as_secs())
            .map_err(|_| AuthError::SigningError("token lifetime out of range".to_string()))?;
        let claims = Claims::new(signing.claim_name(), identity, self.clock.now(), ttl);

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(signing.key()),
        )
        .map_err(|e| AuthError::SigningError(e.to_string()))
    }

    /// Verifies `token` against `key` and returns the identity it carries.
    pub fn verify(&self, token: &str, key: &[u8]) -> Result<String, AuthError> {
        let claims = decode::<Claims>(token, &DecodingKey::from_secret(key), &validation())
            .map_err(map_decode_error)?
            .claims;

        if claims.iat != claims.nbf {
            return Err(AuthError::TokenInvalid(
                "issued-at and not-before claims differ".to_string(),
            ));
        }
        if !claims.is_active_at(self.clock.now()) {
            return Err(AuthError::TokenExpired);
        }

        let claim_name = self.claim_name();
        claims
            .identity(claim_name)
            .map(str::to_string)
            .ok_or_else(|| AuthError::TokenInvalid(format!("missing '{claim_name}' claim")))
    }

    /// Extracts a bearer token from `carrier` and verifies it with the configured key.
    pub fn verify_from_carrier<C>(&self, carrier: &C) -> Result<String, AuthError>
    where
        C: CredentialCarrier + ?Sized,
    {
        let token = bearer_token(carrier.authorization())?;
        let signing = self.signing.get().ok_or_else(|| {
            AuthError::TokenInvalid("token service is not initialized".to_string())
        })?;
        let identity = self.verify(token, signing.key())?;
        debug!(identity = %identity, "Bearer token verified");
        Ok(identity)
    }
}

/// Signature and algorithm checks only; the time window is checked
/// against the injected clock.
fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation.leeway = 0;
    validation
}

fn map_decode_error(e: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;

    let reason = match e.kind() {
        ErrorKind::InvalidSignature => "signature mismatch".to_string(),
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            "unexpected signing algorithm".to_string()
        }
        ErrorKind::InvalidToken => "malformed token".to_string(),
        _ => format!("token validation failed: {e}"),
    };
    warn!(reason = %reason, "Rejected bearer token");
    AuthError::TokenInvalid(reason)
}
