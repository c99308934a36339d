use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

use crate::error::{AppError, AppResult};

fn hash_failure(stage: &'static str, err: password_hash::Error) -> AppError {
    AppError::Internal(anyhow::anyhow!("{stage}: {err}"))
}

/// Argon2id PHC string with a fresh random salt.
pub fn hash_password(plain: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|e| hash_failure("hash password", e))
}

/// `Ok(false)` only for a mismatch. An unreadable stored hash, or a hash
/// whose parameters argon2 refuses, is an internal error.
pub fn verify_password(plain: &str, stored: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| hash_failure("parse stored hash", e))?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(hash_failure("verify password", e)),
    }
}
