//! HTTP surface of pensive: sessions, account service, feed assembly,
//! handlers and the router that ties them together.

pub mod accounts;
pub mod auth;
pub mod error;
pub mod feed;
pub mod mail;
pub mod media;
pub mod metrics;
pub mod posts;
pub mod session;
pub mod settings;
pub mod state;
pub mod templates;
pub mod validate;
pub mod verify;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    response::Redirect,
    routing::{get, post},
};

pub use error::{AppError, Fallback};
pub use mail::{LogMailer, Mailer, SmtpMailer};
pub use state::AppState;

/// All routes except static assets, which the binary mounts itself.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(posts::home))
        .route("/home", get(|| async { Redirect::to("/") }))
        .route("/{handle}", get(posts::profile))
        .route(
            "/post",
            post(posts::create_post).layer(DefaultBodyLimit::max(posts::MAX_UPLOAD_SIZE)),
        )
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        .route("/settings", get(settings::index))
        .route(
            "/settings/profile",
            get(settings::profile_page).post(settings::update_profile),
        )
        .route(
            "/settings/privacy",
            get(settings::privacy_page).post(settings::update_privacy),
        )
        .route(
            "/settings/account",
            get(settings::account_page).post(settings::update_account),
        )
        .route("/verify", get(verify::accept).post(verify::send))
        .route("/media/{bucket}/{*key}", get(media::presigned))
        .route("/files/{*key}", get(media::own_file))
        .route("/metrics", get(metrics::render))
        .route_layer(middleware::from_fn(metrics::track))
        .with_state(state)
}
