//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Login request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username.
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    /// Password.
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Registration request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUserRequest {
    /// Login name; letters and digits only.
    #[validate(
        length(min = 1, max = 255),
        custom(function = "validate_username")
    )]
    pub username: String,
    /// Plaintext password.
    #[validate(length(max = 18, message = "Password must be at most 18 characters"))]
    pub password: String,
    /// Display name.
    #[validate(length(min = 1, max = 255))]
    pub nickname: String,
    /// Email address.
    #[validate(email)]
    pub email: String,
    /// Phone number.
    #[validate(length(equal = 11, message = "Phone number must be 11 digits"))]
    pub phone: String,
}

/// Usernames become path segments and policy subjects, so only ASCII
/// letters and digits are allowed.
fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Ok(());
    }
    let mut err = ValidationError::new("alphanumeric");
    err.message = Some("Username may only contain letters and digits".into());
    Err(err)
}

/// Password change request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    /// Current password.
    #[validate(length(min = 1, message = "Current password is required"))]
    pub old_password: String,
    /// Replacement password.
    #[validate(length(max = 18, message = "Password must be at most 18 characters"))]
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(username: &str, email: &str, phone: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: username.to_string(),
            password: "miniblog1234".to_string(),
            nickname: "belm".to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
        }
    }

    #[test]
    fn test_valid_registration() {
        let req = registration("belm", "belm@example.com", "18188888888");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_bad_email_and_phone_rejected() {
        assert!(registration("belm", "not-an-email", "18188888888").validate().is_err());
        assert!(registration("belm", "belm@example.com", "123").validate().is_err());
    }

    #[test]
    fn test_username_charset() {
        for name in ["bel m", "../x", "alice*"] {
            let errors = registration(name, "belm@example.com", "18188888888")
                .validate()
                .unwrap_err();
            assert!(errors.field_errors().contains_key("username"), "{name}");
        }
    }

    #[test]
    fn test_long_nickname_accepted() {
        let mut req = registration("belm", "belm@example.com", "18188888888");
        req.nickname = "n".repeat(255);
        assert!(req.validate().is_ok());
        req.nickname.push('n');
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_change_password_uses_camel_case() {
        let req: ChangePasswordRequest =
            serde_json::from_str(r#"{"oldPassword":"a","newPassword":"bbbbbb"}"#).unwrap();
        assert_eq!(req.old_password, "a");
        assert_eq!(req.new_password, "bbbbbb");
    }
}
