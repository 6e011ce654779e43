use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;
use thiserror::Error;

/// Signed cookies need at least 512 bits of key material.
pub const SECRET_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("secret is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("secret too short: {0} bytes, need at least {SECRET_LEN}")]
    TooShort(usize),
}

/// Generate a random 512-bit secret.
pub fn generate_secret() -> [u8; SECRET_LEN] {
    let mut key = [0u8; SECRET_LEN];
    rand::rng().fill_bytes(&mut key);
    key
}

/// Encode a secret to base64 for `.env` files.
pub fn secret_to_base64(key: &[u8]) -> String {
    BASE64.encode(key)
}

/// Decode a base64 secret, rejecting anything shorter than [`SECRET_LEN`].
pub fn secret_from_base64(encoded: &str) -> Result<Vec<u8>, KeyError> {
    let bytes = BASE64.decode(encoded.trim())?;
    if bytes.len() < SECRET_LEN {
        return Err(KeyError::TooShort(bytes.len()));
    }
    Ok(bytes)
}
