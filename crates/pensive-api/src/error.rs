use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;
use tracing::{debug, error, warn};

use pensive_crypto::{PasswordError, TokenError};
use pensive_db::StoreError;
use pensive_storage::ObjectStoreError;

use crate::mail::MailError;
use crate::validate::ValidationError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not logged in")]
    NotLoggedIn,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Objects(#[from] ObjectStoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("user is already verified")]
    AlreadyVerified,

    #[error("{0}")]
    BadForm(&'static str),

    #[error(transparent)]
    Multipart(#[from] MultipartError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error(transparent)]
    Render(#[from] askama::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Pages that fail outright answer with a bare status. A missing session
/// always goes back to the login form.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, AppError::NotLoggedIn) {
            return Redirect::to("/login").into_response();
        }
        error!("request failed: {}", self);
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

/// An error paired with the page the browser is sent back to.
#[derive(Debug)]
pub struct Fallback {
    pub error: AppError,
    pub to: String,
}

impl Fallback {
    pub fn new(error: impl Into<AppError>, to: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            to: to.into(),
        }
    }
}

impl IntoResponse for Fallback {
    fn into_response(self) -> Response {
        match self.error {
            AppError::NotLoggedIn => {
                debug!("unauthorized, redirecting to /login");
                Redirect::to("/login").into_response()
            }
            err => {
                warn!("{} (redirecting to {})", err, self.to);
                Redirect::to(&self.to).into_response()
            }
        }
    }
}

pub trait OrRedirect<T> {
    fn or_redirect(self, to: &str) -> Result<T, Fallback>;
}

impl<T, E: Into<AppError>> OrRedirect<T> for Result<T, E> {
    fn or_redirect(self, to: &str) -> Result<T, Fallback> {
        self.map_err(|e| Fallback::new(e, to))
    }
}
