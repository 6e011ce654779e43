use axum::{
    Form,
    extract::State,
    response::{Html, Redirect},
};

use pensive_types::api::{AccountForm, PrivacyForm, ProfileForm};

use crate::accounts;
use crate::auth::CurrentUser;
use crate::error::{AppError, Fallback, OrRedirect};
use crate::state::AppState;
use crate::templates::{AccountTemplate, PrivacyTemplate, ProfileTemplate, SettingsTemplate, render};

const PROFILE: &str = "/settings/profile";
const PRIVACY: &str = "/settings/privacy";
const ACCOUNT: &str = "/settings/account";

pub async fn index(CurrentUser(user): CurrentUser) -> Result<Html<String>, AppError> {
    render(&SettingsTemplate {
        title: "Settings",
        name: format!("@{}", user.username),
    })
}

pub async fn profile_page(CurrentUser(user): CurrentUser) -> Result<Html<String>, AppError> {
    render(&ProfileTemplate {
        title: "Profile",
        name: format!("@{}", user.username),
        username: user.username,
    })
}

/// Change username. Needs the current password.
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<ProfileForm>,
) -> Result<Redirect, Fallback> {
    if form.username.is_empty() || form.password.is_empty() {
        return Err(Fallback::new(
            AppError::BadForm("username, or password cannot be empty"),
            PROFILE,
        ));
    }

    let db = state.db.clone();
    state
        .blocking(move || accounts::update_username(&db, user.id, &form.username, &form.password))
        .await
        .or_redirect(PROFILE)?;
    Ok(Redirect::to(PROFILE))
}

pub async fn privacy_page(CurrentUser(user): CurrentUser) -> Result<Html<String>, AppError> {
    render(&PrivacyTemplate {
        title: "Privacy",
        name: format!("@{}", user.username),
    })
}

/// Change password. The new one has to be typed twice.
pub async fn update_privacy(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<PrivacyForm>,
) -> Result<Redirect, Fallback> {
    let PrivacyForm {
        old_password,
        new_password,
        conf_password,
    } = form;
    if old_password.is_empty() || new_password.is_empty() || conf_password.is_empty() {
        return Err(Fallback::new(
            AppError::BadForm("old, new or confirmation password cannot be empty"),
            PRIVACY,
        ));
    }
    if new_password != conf_password {
        return Err(Fallback::new(AppError::BadForm("password mismatch"), PRIVACY));
    }

    let db = state.db.clone();
    state
        .blocking(move || accounts::update_password(&db, user.id, &old_password, &new_password))
        .await
        .or_redirect(PRIVACY)?;
    Ok(Redirect::to(PRIVACY))
}

pub async fn account_page(CurrentUser(user): CurrentUser) -> Result<Html<String>, AppError> {
    render(&AccountTemplate {
        title: "Account",
        name: format!("@{}", user.username),
        email: user.email,
        is_verified: user.is_verified,
    })
}

/// Change email. Needs the current password.
pub async fn update_account(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<AccountForm>,
) -> Result<Redirect, Fallback> {
    if form.email.is_empty() || form.password.is_empty() {
        return Err(Fallback::new(
            AppError::BadForm("email, or password cannot be empty"),
            ACCOUNT,
        ));
    }

    let db = state.db.clone();
    state
        .blocking(move || accounts::update_email(&db, user.id, &form.email, &form.password))
        .await
        .or_redirect(ACCOUNT)?;
    Ok(Redirect::to(ACCOUNT))
}
