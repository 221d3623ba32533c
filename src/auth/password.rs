//! bcrypt wrappers. The salt is random per call and embedded in the output,
//! and `bcrypt::verify` compares in constant time.

use crate::error::{AppError, AppResult};

pub fn hash_password(plaintext: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(plaintext, cost)
}

/// `Ok(false)` on a wrong password, `Err` only when the stored hash is malformed.
pub fn verify_password(plaintext: &str, hashed: &str) -> Result<bool, bcrypt::BcryptError> {
    bcrypt::verify(plaintext, hashed)
}

/// Hash on the blocking pool so the runtime isn't stalled by bcrypt.
pub async fn hash_password_blocking(plaintext: String, cost: u32) -> AppResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&plaintext, cost))
        .await
        .map_err(|e| AppError::Internal(format!("hash task failed: {e}")))?
        .map_err(AppError::from)
}

pub async fn verify_password_blocking(plaintext: String, hashed: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&plaintext, &hashed))
        .await
        .map_err(|e| AppError::Internal(format!("verify task failed: {e}")))?
        .map_err(AppError::from)
}
