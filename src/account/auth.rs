//! Salted password hashing

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("password hashing failed: {0}")]
    HashFailed(String),
    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),
}

/// Hash a password using Argon2id with a fresh random salt.
///
/// Returns `(password_hash, salt)`. The hash is a PHC string that embeds the
/// salt as well; the salt is returned separately so it can be persisted
/// alongside the record.
pub fn hash_password(password: &str) -> Result<(String, String), AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::HashFailed(e.to_string()))?
        .to_string();

    Ok((password_hash, salt.as_str().to_string()))
}

/// Check a password against a stored hash.
///
/// `Ok(false)` is a wrong password; `Err` means the stored hash itself is unusable.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AuthError> {
    let parsed_hash =
        PasswordHash::new(password_hash).map_err(|e| AuthError::MalformedHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
