use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Verification links stay valid for 15 minutes.
pub const TOKEN_TTL_MINUTES: i64 = 15;

/// Claims carried by an email-verification token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationClaims {
    pub authorized: bool,
    pub user_id: String,
    pub exp: usize,
}

#[derive(Debug, Error)]
pub enum TokenError {
    /// Bad signature, malformed token or expired.
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("user is not authorized")]
    Unauthorized,

    #[error("claims don't match the expected user")]
    SubjectMismatch,
}

/// Issue a token for `user_id`, valid for [`TOKEN_TTL_MINUTES`].
pub fn create(secret: &str, user_id: &str) -> Result<String, TokenError> {
    create_with_ttl(secret, user_id, Duration::minutes(TOKEN_TTL_MINUTES))
}

pub fn create_with_ttl(secret: &str, user_id: &str, ttl: Duration) -> Result<String, TokenError> {
    let claims = VerificationClaims {
        authorized: true,
        user_id: user_id.to_string(),
        exp: (Utc::now() + ttl).timestamp().max(0) as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Check the signature and expiry, then that the token was issued for `user_id`.
pub fn verify(secret: &str, token: &str, user_id: &str) -> Result<(), TokenError> {
    let data = decode::<VerificationClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;

    if !data.claims.authorized {
        return Err(TokenError::Unauthorized);
    }
    if data.claims.user_id != user_id {
        return Err(TokenError::SubjectMismatch);
    }
    Ok(())
}
