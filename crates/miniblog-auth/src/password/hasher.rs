//! Argon2id password hashing and verification.

use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher as ArgonHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use miniblog_core::error::AppError;

/// Hashes passwords for storage and checks login attempts against stored hashes.
#[derive(Debug, Clone, Default)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    /// Creates a hasher with Argon2id default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Produces a salted PHC-format hash of `plaintext`.
    pub fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;
        Ok(hash.to_string())
    }

    /// Returns `true` when `plaintext` matches `stored`.
    ///
    /// A stored value that is not a parsable hash never matches.
    pub fn verify(&self, plaintext: &str, stored: &str) -> bool {
        let parsed = match PasswordHash::new(stored) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash is malformed");
                return false;
            }
        };
        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hasher = PasswordHasher::new();
        let stored = hasher.hash("miniblog1234").unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert!(hasher.verify("miniblog1234", &stored));
        assert!(!hasher.verify("miniblog12345", &stored));
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let hasher = PasswordHasher::new();
        let a = hasher.hash("secret").unwrap();
        let b = hasher.hash("secret").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_never_matches() {
        let hasher = PasswordHasher::new();
        assert!(!hasher.verify("secret", "secret"));
        assert!(!hasher.verify("", ""));
    }
}
