//! Password hashing with Argon2 and strength checks with zxcvbn

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;
use traveldesk_shared::constants::{MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH};
use zxcvbn::{zxcvbn, Score};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PasswordError {
    #[error("Hash error: {0}")]
    HashError(String),
    #[error("Verification failed")]
    VerificationFailed,
    #[error("Password must be at least {0} characters")]
    TooShort(usize),
    #[error("Password must be at most {0} characters")]
    TooLong(usize),
    #[error("Password is too weak")]
    TooWeak,
}

pub struct PasswordService;

impl PasswordService {
    pub fn hash(password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| PasswordError::HashError(e.to_string()))
    }

    pub fn verify(password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| PasswordError::HashError(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Length bounds plus a zxcvbn score of at least two. `user_inputs` are
    /// account attributes (username, email, names) the password must not lean on.
    pub fn validate_strength(password: &str, user_inputs: &[&str]) -> Result<(), PasswordError> {
        let length = password.chars().count();
        if length < MIN_PASSWORD_LENGTH {
            return Err(PasswordError::TooShort(MIN_PASSWORD_LENGTH));
        }
        if length > MAX_PASSWORD_LENGTH {
            return Err(PasswordError::TooLong(MAX_PASSWORD_LENGTH));
        }
        if zxcvbn(password, user_inputs).score() < Score::Two {
            return Err(PasswordError::TooWeak);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = PasswordService::hash("Correct-Horse-42").unwrap();
        assert!(PasswordService::verify("Correct-Horse-42", &hash).unwrap());
        assert!(!PasswordService::verify("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(matches!(
            PasswordService::verify("anything", "not-a-phc-string"),
            Err(PasswordError::HashError(_))
        ));
    }

    #[test]
    fn test_strength_rules() {
        assert_eq!(
            PasswordService::validate_strength("short", &[]),
            Err(PasswordError::TooShort(MIN_PASSWORD_LENGTH))
        );
        assert_eq!(
            PasswordService::validate_strength("password", &[]),
            Err(PasswordError::TooWeak)
        );
        assert!(PasswordService::validate_strength("Glacier-Harbor-Sunset-91", &[]).is_ok());
        let long = "x".repeat(MAX_PASSWORD_LENGTH + 1);
        assert_eq!(
            PasswordService::validate_strength(&long, &[]),
            Err(PasswordError::TooLong(MAX_PASSWORD_LENGTH))
        );
    }
}
