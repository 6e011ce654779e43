//! Cookie-backed sessions.
//!
//! The whole session is one JSON object stored in a single signed cookie.
//! Nothing is kept server side; tampering is caught by the cookie signature.

use std::convert::Infallible;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::AppError;

pub const COOKIE_NAME: &str = "session";

/// Session key holding the authenticated user's id.
pub const USER_ID: &str = "user_id";

pub struct Session {
    jar: SignedCookieJar,
    values: Map<String, Value>,
}

impl Session {
    fn from_jar(jar: SignedCookieJar) -> Self {
        let values = jar
            .get(COOKIE_NAME)
            .and_then(|cookie| decode(cookie.value()))
            .unwrap_or_default();
        Self { jar, values }
    }

    /// Value stored under `key`. Missing or malformed values read as
    /// [`AppError::NotLoggedIn`].
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, AppError> {
        let value = self.values.get(key).ok_or(AppError::NotLoggedIn)?;
        serde_json::from_value(value.clone()).map_err(|e| {
            debug!("session value {} unreadable: {}", key, e);
            AppError::NotLoggedIn
        })
    }

    /// Store `value` under `key`. The returned jar must be part of the
    /// response for the change to reach the browser.
    pub fn set<T: Serialize>(mut self, key: &str, value: T) -> Result<SignedCookieJar, AppError> {
        let value = serde_json::to_value(value).map_err(|e| AppError::Internal(e.to_string()))?;
        self.values.insert(key.to_string(), value);
        self.save()
    }

    pub fn unset(mut self, key: &str) -> Result<SignedCookieJar, AppError> {
        self.values.remove(key);
        if self.values.is_empty() {
            return Ok(self.jar.remove(Cookie::build(COOKIE_NAME).path("/")));
        }
        self.save()
    }

    fn save(self) -> Result<SignedCookieJar, AppError> {
        let json = serde_json::to_vec(&self.values).map_err(|e| AppError::Internal(e.to_string()))?;
        let cookie = Cookie::build((COOKIE_NAME, URL_SAFE_NO_PAD.encode(json)))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax);
        Ok(self.jar.add(cookie))
    }
}

fn decode(raw: &str) -> Option<Map<String, Value>> {
    let bytes = URL_SAFE_NO_PAD.decode(raw).ok()?;
    serde_json::from_slice(&bytes).ok()
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    Key: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = SignedCookieJar::<Key>::from_request_parts(parts, state).await?;
        Ok(Self::from_jar(jar))
    }
}
