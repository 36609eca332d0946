//! Authentication module
//!
//! Credential hashing, token generation, and the account/session services
//! for the authd server.

pub mod accounts;
pub mod store;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::TryRngCore;
use thiserror::Error;

/// Byte length of session and CSRF tokens before hex encoding (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("username and password must each be at least {0} characters")]
    InvalidInput(usize),

    #[error("username already exists")]
    DuplicateUser,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("unauthorized")]
    Unauthorized,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("secure random source unavailable: {0}")]
    Entropy(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Hash a password with Argon2id and a fresh random salt.
///
/// Returns a PHC-format string (`$argon2id$v=19$...`) carrying the salt and
/// work-factor parameters alongside the digest.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Verify a password against a stored PHC-format hash.
///
/// A mismatch is `Ok(false)`; only a malformed stored hash is an error.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored).map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Generate an opaque token of `byte_len` random bytes, hex-encoded.
///
/// Draws from the OS CSPRNG. If the secure source is unavailable the call
/// fails; there is no fallback to a non-cryptographic generator.
pub fn generate_token(byte_len: usize) -> Result<String, AuthError> {
    let mut bytes = vec![0u8; byte_len];
    rand::rngs::OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AuthError::Entropy(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// Byte comparison whose running time does not depend on where the inputs
/// first differ. Token lengths are not secret, so a length mismatch may
/// return early.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_generation() {
        let token1 = generate_token(TOKEN_BYTES).unwrap();
        let token2 = generate_token(TOKEN_BYTES).unwrap();

        // Tokens should be 64 hex chars (256 bits)
        assert_eq!(token1.len(), 64);
        assert_eq!(token2.len(), 64);

        // Tokens should be unique
        assert_ne!(token1, token2);

        // And decodable as hex
        assert!(hex::decode(&token1).is_ok());
    }

    #[test]
    fn test_token_length_follows_request() {
        let token = generate_token(16).unwrap();
        assert_eq!(token.len(), 32);
    }

    #[test]
    fn test_password_hash_is_phc_format() {
        let hash = hash_password("secret123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert_ne!(hash, "secret123");
    }

    #[test]
    fn test_password_hash_salted() {
        // Same password hashes differently each time (random salt)
        let hash1 = hash_password("secret123").unwrap();
        let hash2 = hash_password("secret123").unwrap();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("mysecret1").unwrap();

        assert!(verify_password("mysecret1", &hash).unwrap());
        assert!(!verify_password("wrongpassword", &hash).unwrap());
    }

    #[test]
    fn test_verify_malformed_hash_is_error() {
        let result = verify_password("anything", "not-a-phc-string");
        assert!(matches!(result, Err(AuthError::Hashing(_))));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"short", b"longer"));
        assert!(constant_time_eq(b"", b""));
    }
}
