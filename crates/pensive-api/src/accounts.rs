//! Account operations behind the login, register and settings pages.
//!
//! Everything here is synchronous (argon2 plus store batches); handlers run
//! these through [`AppState::blocking`](crate::AppState::blocking).

use pensive_crypto::{PasswordError, authenticate as check_password, hash_password};
use pensive_db::{Database, StoreError};
use pensive_types::{User, UserUpdate};
use tracing::info;

use crate::error::AppError;
use crate::validate;

pub fn register(
    db: &Database,
    username: &str,
    password: &str,
    email: &str,
) -> Result<User, AppError> {
    validate::email(email)?;
    validate::username(username)?;
    if password.is_empty() {
        return Err(AppError::BadForm("password cannot be empty"));
    }

    let hash = hash_password(password)?;
    let user = db.add_user(username, &hash, email)?;
    info!("Registered @{} as user {}", user.username, user.id);
    Ok(user)
}

/// Unknown usernames and wrong passwords both come back as
/// [`PasswordError::InvalidLogin`].
pub fn authenticate(db: &Database, username: &str, password: &str) -> Result<User, AppError> {
    let user = match db.get_user_by_name(username) {
        Ok(user) => user,
        Err(StoreError::UserNotFound) => return Err(PasswordError::InvalidLogin.into()),
        Err(e) => return Err(e.into()),
    };
    check_password(&user.password_hash, password)?;
    Ok(user)
}

fn confirm(db: &Database, id: i64, password: &str) -> Result<(), AppError> {
    let user = db.get_user(id)?;
    check_password(&user.password_hash, password)?;
    Ok(())
}

pub fn update_username(
    db: &Database,
    id: i64,
    new_username: &str,
    current_password: &str,
) -> Result<(), AppError> {
    validate::username(new_username)?;
    confirm(db, id, current_password)?;
    db.update_user(
        id,
        &UserUpdate {
            username: Some(new_username.to_string()),
            ..Default::default()
        },
    )?;
    info!("User {} is now @{}", id, new_username);
    Ok(())
}

/// The new password is stored hashed, never as given.
pub fn update_password(
    db: &Database,
    id: i64,
    old_password: &str,
    new_password: &str,
) -> Result<(), AppError> {
    if new_password.is_empty() {
        return Err(AppError::BadForm("new password cannot be empty"));
    }
    confirm(db, id, old_password)?;
    let hash = hash_password(new_password)?;
    db.update_user(
        id,
        &UserUpdate {
            password_hash: Some(hash),
            ..Default::default()
        },
    )?;
    info!("User {} changed password", id);
    Ok(())
}

pub fn update_email(
    db: &Database,
    id: i64,
    new_email: &str,
    current_password: &str,
) -> Result<(), AppError> {
    validate::email(new_email)?;
    confirm(db, id, current_password)?;
    db.update_user(
        id,
        &UserUpdate {
            email: Some(new_email.to_string()),
            ..Default::default()
        },
    )?;
    Ok(())
}
