use lettre::Address;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("username is not valid (2 to 20 characters of A-z 0-9 - _)")]
    Username,

    #[error("email provided is not valid")]
    Email,
}

/// 2 to 20 ASCII letters, digits, dashes or underscores.
pub fn username(input: &str) -> Result<(), ValidationError> {
    let ok = (2..=20).contains(&input.len())
        && input
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if ok { Ok(()) } else { Err(ValidationError::Username) }
}

pub fn email(input: &str) -> Result<(), ValidationError> {
    input
        .parse::<Address>()
        .map(|_| ())
        .map_err(|_| ValidationError::Email)
}
