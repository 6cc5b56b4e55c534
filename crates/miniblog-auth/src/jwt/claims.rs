//! Claims payload carried by identity tokens.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Token payload: the three time claims plus the identity claim.
///
/// The identity claim's name is configurable, so it lives in `extra`
/// alongside any other non-time claims a token may carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Issued-at (seconds since epoch).
    pub iat: i64,
    /// Not-before (seconds since epoch). Always equal to `iat` for issued tokens.
    pub nbf: i64,
    /// Expiry (seconds since epoch).
    pub exp: i64,
    /// Every other claim, keyed by name.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Builds claims for `identity` stored under `claim_name`, valid for `ttl_seconds` from `now`.
    pub fn new(claim_name: &str, identity: &str, now: i64, ttl_seconds: i64) -> Self {
        let mut extra = Map::new();
        extra.insert(claim_name.to_string(), Value::String(identity.to_string()));
        Self {
            iat: now,
            nbf: now,
            exp: now + ttl_seconds,
            extra,
        }
    }

    /// Returns the string value of `claim_name`, if present.
    pub fn identity(&self, claim_name: &str) -> Option<&str> {
        self.extra.get(claim_name).and_then(Value::as_str)
    }

    /// Whether `now` falls inside `[nbf, exp)`.
    pub fn is_active_at(&self, now: i64) -> bool {
        now >= self.nbf && now < self.exp
    }
}
