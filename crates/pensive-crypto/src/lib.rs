//! Pensive Crypto Library
//!
//! Credential hashing (Argon2id), signed email-verification tokens (HS256 JWT)
//! and random secret generation for cookie / media signing keys.

pub mod keys;
pub mod password;
pub mod token;

pub use password::{PasswordError, authenticate, hash_password};
pub use token::TokenError;
