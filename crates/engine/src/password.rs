//! Salted password hashes.
//!
//! Stored as a PHC string (`$argon2id$v=19$...`), so the parameters travel
//! with the hash.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Hash `password` with a fresh random salt.
pub fn hash_password(password: &str) -> ResultEngine<String> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|err| EngineError::PasswordHash(err.to_string()))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| EngineError::PasswordHash(err.to_string()))?;
    Ok(hash.to_string())
}

/// Check `password` against a value produced by [`hash_password`].
pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .and_then(|hash| Argon2::default().verify_password(password.as_bytes(), &hash))
        .is_ok()
}
