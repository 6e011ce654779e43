use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{self, SaltString, rand_core::OsRng},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    /// The password does not match the stored hash.
    #[error("invalid login")]
    InvalidLogin,

    #[error("password hashing failed: {0}")]
    Hash(password_hash::Error),
}

/// Hash a password with Argon2id and a fresh random salt.
/// Returns the PHC string, which embeds the salt and parameters.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(PasswordError::Hash)?;
    Ok(hash.to_string())
}

/// Compare a password against a stored PHC hash.
pub fn authenticate(hash: &str, password: &str) -> Result<(), PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(PasswordError::Hash)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(()),
        Err(password_hash::Error::Password) => Err(PasswordError::InvalidLogin),
        Err(e) => Err(PasswordError::Hash(e)),
    }
}
