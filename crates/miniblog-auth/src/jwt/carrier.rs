//! Extraction of bearer credentials from request carriers.

use crate::error::AuthError;

/// Anything that can expose a request's `Authorization` value.
pub trait CredentialCarrier {
    /// Raw `Authorization` value, if the carrier has one.
    fn authorization(&self) -> Option<&str>;
}

impl CredentialCarrier for str {
    fn authorization(&self) -> Option<&str> {
        Some(self)
    }
}

impl CredentialCarrier for Option<&str> {
    fn authorization(&self) -> Option<&str> {
        *self
    }
}

/// Pulls the token out of a `Bearer <token>` value.
///
/// The scheme is matched case-insensitively. Anything else, including
/// a bearer scheme with no token, is a missing credential.
pub fn bearer_token(value: Option<&str>) -> Result<&str, AuthError> {
    let value = value.ok_or(AuthError::MissingCredential)?.trim();
    let (scheme, token) = value
        .split_once(char::is_whitespace)
        .ok_or(AuthError::MissingCredential)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MissingCredential);
    }
    match token.trim() {
        "" => Err(AuthError::MissingCredential),
        token => Ok(token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_scheme_case_insensitive() {
        assert_eq!(bearer_token(Some("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
        assert_eq!(bearer_token(Some("bearer abc")), Ok("abc"));
        assert_eq!(bearer_token(Some("BEARER   abc ")), Ok("abc"));
    }

    #[test]
    fn test_missing_or_malformed_header() {
        assert_eq!(bearer_token(None), Err(AuthError::MissingCredential));
        assert_eq!(bearer_token(Some("")), Err(AuthError::MissingCredential));
        assert_eq!(bearer_token(Some("Bearer")), Err(AuthError::MissingCredential));
        assert_eq!(bearer_token(Some("Bearer   ")), Err(AuthError::MissingCredential));
        assert_eq!(
            bearer_token(Some("Basic YWxpY2U6cHc=")),
            Err(AuthError::MissingCredential)
        );
    }

    #[test]
    fn test_carrier_impls() {
        let header = "Bearer t";
        assert_eq!(header.authorization(), Some("Bearer t"));
        assert_eq!(None::<&str>.authorization(), None);
    }
}
