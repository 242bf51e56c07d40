use serde::Deserialize;
use validator::Validate;

/// Login request payload. `username` also accepts an email address.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(alias = "email")]
    #[validate(length(min = 1, message = "Username or email is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PasswordResetRequest {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PasswordResetConfirmRequest {
    #[validate(length(min = 1, message = "Reset token is required"))]
    pub token: String,
    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
    pub confirm_password: String,
}

/// Admin-set password for another user.
#[derive(Debug, Deserialize, Validate)]
pub struct SetPasswordRequest {
    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
    pub confirm_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_accepts_email_alias() {
        let req: LoginRequest = serde_json::from_str(r#"{"email":"ann@example.com","password":"x"}"#).unwrap();
        assert_eq!(req.username, "ann@example.com");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_reset_request_needs_valid_email() {
        let req: PasswordResetRequest = serde_json::from_str(r#"{"email":"not-an-email"}"#).unwrap();
        assert!(req.validate().is_err());
        let req: PasswordResetRequest = serde_json::from_str(r#"{"email":"ann@example.com"}"#).unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_empty_password_rejected() {
        let req = LoginRequest { username: "ann".into(), password: String::new() };
        assert!(req.validate().is_err());
    }
}
