use axum::{
    Form,
    extract::{FromRequestParts, State},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::SignedCookieJar;
use tracing::info;

use pensive_types::User;
use pensive_types::api::{LoginForm, RegisterForm};

use crate::accounts;
use crate::error::{AppError, Fallback, OrRedirect};
use crate::session::{Session, USER_ID};
use crate::state::AppState;
use crate::templates::{LoginTemplate, RegisterTemplate, render};

/// The logged-in user. Requests without a usable session are sent to
/// `/login`.
pub struct CurrentUser(pub User);

/// Resolve the session's user id to a user record with a username.
pub async fn session_user(state: &AppState, session: &Session) -> Result<User, AppError> {
    let id: i64 = session.get(USER_ID)?;
    let user = match state.db(move |db| db.get_user(id)).await {
        Ok(user) => user,
        Err(AppError::Store(pensive_db::StoreError::UserNotFound)) => {
            return Err(AppError::NotLoggedIn);
        }
        Err(e) => return Err(e),
    };
    if user.username.is_empty() {
        return Err(AppError::NotLoggedIn);
    }
    Ok(user)
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Fallback;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .unwrap_or_else(|never| match never {});
        let user = session_user(state, &session).await.or_redirect("/login")?;
        Ok(CurrentUser(user))
    }
}

/// GET /login
pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
) -> Result<Response, AppError> {
    if session_user(&state, &session).await.is_ok() {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(render(&LoginTemplate { title: "Log in" })?.into_response())
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<(SignedCookieJar, Redirect), Fallback> {
    let LoginForm { username, password } = form;
    let db = state.db.clone();
    let user = state
        .blocking(move || accounts::authenticate(&db, &username, &password))
        .await
        .or_redirect("/login")?;

    let jar = session.set(USER_ID, user.id).or_redirect("/login")?;
    info!("@{} logged in", user.username);
    Ok((jar, Redirect::to("/")))
}

/// GET /register
pub async fn register_page(
    State(state): State<AppState>,
    session: Session,
) -> Result<Response, AppError> {
    if session_user(&state, &session).await.is_ok() {
        return Ok(Redirect::to("/login").into_response());
    }
    Ok(render(&RegisterTemplate { title: "Register" })?.into_response())
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Redirect, Fallback> {
    let RegisterForm { username, password, email } = form;
    let db = state.db.clone();
    state
        .blocking(move || accounts::register(&db, &username, &password, &email))
        .await
        .or_redirect("/register")?;
    Ok(Redirect::to("/login"))
}

/// POST /logout
pub async fn logout(session: Session) -> Result<(SignedCookieJar, Redirect), Fallback> {
    let jar = session.unset(USER_ID).or_redirect("/login")?;
    Ok((jar, Redirect::to("/login")))
}
