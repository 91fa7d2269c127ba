//! Credential hashing
//!
//! Passwords are stored as Argon2id PHC strings with a random salt per hash.

use anyhow::{Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a plaintext password into a PHC string (`$argon2id$...`).
///
/// ```ignore
/// use storefront::services::password::hash_password;
///
/// let hash = hash_password("dogs4life")?;
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;

    Ok(password_hash.to_string())
}

/// Check a plaintext candidate against a stored hash.
///
/// A mismatch is `Ok(false)`; only a malformed hash or an internal argon2
/// failure is an error.
pub fn verify_password(candidate: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))
        .context("Failed to parse password hash")?;

    match Argon2::default().verify_password(candidate.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Password verification failed: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_argon2id_and_salted() {
        let first = hash_password("dogs4life").expect("Failed to hash password");
        let second = hash_password("dogs4life").expect("Failed to hash password");

        assert!(first.starts_with("$argon2id$"));
        assert_ne!(first, second, "Random salt should give distinct hashes");
    }

    #[test]
    fn test_verify_accepts_matching_password() {
        let hash = hash_password("correct horse").expect("Failed to hash password");
        assert!(verify_password("correct horse", &hash).expect("Verification should not error"));
    }

    #[test]
    fn test_verify_rejects_wrong_password() {
        let hash = hash_password("correct horse").expect("Failed to hash password");
        assert!(!verify_password("battery staple", &hash).expect("Verification should not error"));
    }

    #[test]
    fn test_verify_is_case_sensitive() {
        let hash = hash_password("Secret").expect("Failed to hash password");
        assert!(!verify_password("secret", &hash).expect("Verification should not error"));
    }

    #[test]
    fn test_verify_malformed_hash_is_error() {
        assert!(verify_password("password", "plaintext-not-a-hash").is_err());
    }

    #[test]
    fn test_hash_never_contains_plaintext() {
        let password = "my_secret_password";
        let hash = hash_password(password).expect("Failed to hash password");

        assert!(!hash.contains(password));
    }
}
