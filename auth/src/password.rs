//! Password policy and hashing.
//!
//! Passwords are hashed with argon2id and a per-password random salt; the
//! PHC string (which embeds the salt and parameters) is what gets stored.
//! Plaintext passwords never leave this module and are never logged.

use crate::error::{AuthError, Result};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// Characters accepted as the "special character" policy category.
const SPECIAL_CHARACTERS: &str = r#"!@#$%^&*()_+-=[]{};':"\|,.<>/?"#;

/// Validate a password against the registration policy.
///
/// Requirements: at least 8 characters, one uppercase letter, one lowercase
/// letter, one number, one special character. All unmet requirements are
/// reported together so the caller fixes them in one attempt.
///
/// # Errors
///
/// Returns [`AuthError::WeakPassword`] listing every missing requirement.
pub fn validate_password(password: &str) -> Result<()> {
    let mut missing = Vec::new();

    if password.len() < 8 {
        missing.push("at least 8 characters".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        missing.push("an uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        missing.push("a lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        missing.push("a number".to_string());
    }
    if !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
        missing.push("a special character".to_string());
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AuthError::WeakPassword { missing })
    }
}

/// Hash a password with argon2id and a fresh random salt.
///
/// # Errors
///
/// Returns [`AuthError::HashingFailed`] if hashing fails; the underlying
/// reason is intentionally not propagated.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::HashingFailed)
}

/// Verify a password against a stored PHC hash string.
///
/// A malformed stored hash verifies as `false` rather than erroring: the
/// caller treats it exactly like a wrong password.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code

    use super::*;

    #[test]
    fn strong_password_passes() {
        assert!(validate_password("Str0ng!pass").is_ok());
    }

    #[test]
    fn weak_password_names_every_missing_requirement() {
        let err = validate_password("abc").unwrap_err();
        let AuthError::WeakPassword { missing } = err else {
            panic!("expected WeakPassword, got {err:?}");
        };

        let joined = missing.join(", ");
        assert!(joined.contains("8 characters"));
        assert!(joined.contains("uppercase letter"));
        assert!(joined.contains("number"));
        assert!(joined.contains("special character"));
        // "abc" has lowercase, so that one is satisfied.
        assert!(!joined.contains("lowercase"));
    }

    #[test]
    fn each_category_is_checked_independently() {
        // Long enough, but missing exactly one category each.
        assert!(validate_password("lower1!lower").is_err()); // no uppercase
        assert!(validate_password("UPPER1!UPPER").is_err()); // no lowercase
        assert!(validate_password("Upperlow!!").is_err()); // no number
        assert!(validate_password("Upperlow11").is_err()); // no special
    }

    #[test]
    fn hash_and_verify_roundtrip() {
        let hash = hash_password("Str0ng!pass").unwrap();
        assert!(verify_password("Str0ng!pass", &hash));
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn same_password_hashes_differently() {
        let hash1 = hash_password("Str0ng!pass").unwrap();
        let hash2 = hash_password("Str0ng!pass").unwrap();
        assert_ne!(hash1, hash2);
        assert!(verify_password("Str0ng!pass", &hash1));
        assert!(verify_password("Str0ng!pass", &hash2));
    }

    #[test]
    fn malformed_stored_hash_verifies_false() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
