mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum_extra::extract::cookie::Key;
use metrics_exporter_prometheus::PrometheusBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use pensive_api::{AppState, LogMailer, Mailer, SmtpMailer};
use pensive_db::Database;
use pensive_storage::ObjectStore;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pensive=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init record store and object store
    let db = Database::open(&config.db_path)
        .with_context(|| format!("opening {}", config.db_path.display()))?;
    let objects = ObjectStore::new(
        config.media_dir.clone(),
        &config.media_key,
        config.public_url.clone(),
    )
    .await?;

    let cookie_key = Key::try_from(config.session_key.as_slice())
        .map_err(|e| anyhow::anyhow!("PENSIVE_SESSION_KEY: {e}"))?;

    let mailer: Arc<dyn Mailer> = if config.smtp.password.is_empty() {
        warn!("PENSIVE_SMTP_PASSWORD not set, verification mail will only be logged");
        Arc::new(LogMailer)
    } else {
        Arc::new(SmtpMailer::new(
            &config.smtp.host,
            &config.smtp.user,
            &config.smtp.password,
        )?)
    };

    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .context("installing metrics recorder")?;

    let state = AppState::new(
        db,
        objects,
        cookie_key,
        &config.access_secret,
        config.public_url.clone(),
        mailer,
    )
    .with_metrics(prometheus);

    let app = pensive_api::router(state)
        .nest_service("/static", ServeDir::new(&config.static_dir))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Pensive listening on {}", addr);
    info!("Public URL: {}", config.public_url);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Cannot install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
