//! Credential Store: salted, deliberately slow password hashing.
//!
//! Passwords are hashed with Argon2id and stored as PHC strings, so the salt
//! and parameters travel with the hash. Empty passwords are rejected up front
//! instead of being hashed.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::{instrument, trace, warn};

use crate::error::{Result, SocialError};

/// Hashes `password` with a fresh random salt.
#[instrument(skip_all)]
pub fn hash(password: &str) -> Result<String> {
    if password.is_empty() {
        return Err(SocialError::validation("password", "must not be empty"));
    }

    let salt = SaltString::generate(&mut OsRng);
    let hashed = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| SocialError::Hashing(e.to_string()))?
        .to_string();

    trace!("Password hashed");
    Ok(hashed)
}

/// Checks `password` against a stored PHC string.
///
/// Never fails: a mismatch, an empty password or an unparsable hash all
/// yield `false`. The comparison itself is constant time.
#[instrument(skip_all)]
pub fn verify(password: &str, hashed: &str) -> bool {
    if password.is_empty() {
        return false;
    }

    let parsed = match PasswordHash::new(hashed) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Stored password hash is malformed: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hashed = hash("hunter22").unwrap();

        assert_ne!(hashed, "hunter22");
        assert!(hashed.starts_with("$argon2id$"));
        assert!(verify("hunter22", &hashed));
        assert!(!verify("hunter23", &hashed));
    }

    #[test]
    fn test_same_password_gets_different_salts() {
        let first = hash("password").unwrap();
        let second = hash("password").unwrap();

        assert_ne!(first, second);
        assert!(verify("password", &first));
        assert!(verify("password", &second));
    }

    #[test]
    fn test_empty_password_is_rejected() {
        let err = hash("").unwrap_err();
        assert!(matches!(err, SocialError::Validation { ref field, .. } if field == "password"));
    }

    #[test]
    fn test_verify_never_errors() {
        assert!(!verify("", "$argon2id$whatever"));
        assert!(!verify("password", "not-a-phc-string"));
        assert!(!verify("password", ""));
    }
}
