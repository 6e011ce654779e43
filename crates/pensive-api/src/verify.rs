use axum::{
    extract::{Query, State},
    response::Redirect,
};
use tracing::info;
use url::Url;

use pensive_crypto::token;
use pensive_types::api::VerifyQuery;

use crate::auth::CurrentUser;
use crate::error::{AppError, Fallback, OrRedirect};
use crate::mail::{VERIFY_SUBJECT, verification_body};
use crate::state::AppState;

const ACCOUNT: &str = "/settings/account";

/// `<public_url>/verify?token=<token>`
pub fn verification_link(public_url: &Url, token: &str) -> Result<Url, AppError> {
    let mut link = public_url.clone();
    link.path_segments_mut()
        .map_err(|_| AppError::Internal(format!("{public_url} cannot be a base url")))?
        .pop_if_empty()
        .push("verify");
    link.query_pairs_mut().append_pair("token", token);
    Ok(link)
}

/// POST /verify: mail a verification link to the user's address.
pub async fn send(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Redirect, Fallback> {
    if user.is_verified {
        return Err(Fallback::new(AppError::AlreadyVerified, ACCOUNT));
    }

    let token = token::create(&state.access_secret, &user.id.to_string()).or_redirect(ACCOUNT)?;
    let link = verification_link(&state.public_url, &token).or_redirect(ACCOUNT)?;
    let body = verification_body(&user.username, link.as_str());

    state
        .mailer
        .send(&user.email, VERIFY_SUBJECT, &body)
        .await
        .or_redirect(ACCOUNT)?;
    info!("Sent verification link to @{}", user.username);
    Ok(Redirect::to(ACCOUNT))
}

/// GET /verify?token=: consume a verification link. The token must have
/// been issued for the logged-in user.
pub async fn accept(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<VerifyQuery>,
) -> Result<Redirect, Fallback> {
    if user.is_verified {
        return Err(Fallback::new(AppError::AlreadyVerified, ACCOUNT));
    }

    token::verify(&state.access_secret, &query.token, &user.id.to_string()).or_redirect(ACCOUNT)?;
    let id = user.id;
    if state.db(move |db| db.mark_verified(id)).await.or_redirect(ACCOUNT)? {
        info!("@{} verified their email", user.username);
    }
    Ok(Redirect::to(ACCOUNT))
}
