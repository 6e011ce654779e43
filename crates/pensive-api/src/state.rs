use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::error;
use url::Url;

use pensive_db::Database;
use pensive_storage::ObjectStore;

use crate::error::AppError;
use crate::mail::Mailer;

/// Shared application state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub objects: Arc<ObjectStore>,
    pub cookie_key: Key,
    /// Signs email verification tokens.
    pub access_secret: Arc<str>,
    /// Base for links that leave the server (verification mail, presigned media).
    pub public_url: Url,
    pub mailer: Arc<dyn Mailer>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        db: Database,
        objects: ObjectStore,
        cookie_key: Key,
        access_secret: &str,
        public_url: Url,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            db: Arc::new(db),
            objects: Arc::new(objects),
            cookie_key,
            access_secret: access_secret.into(),
            public_url,
            mailer,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Run a record store call on the blocking pool.
    pub async fn db<F, T>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&Database) -> pensive_db::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        self.blocking(move || f(&db).map_err(AppError::from)).await
    }

    /// Run CPU-bound or synchronous work (password hashing, store batches)
    /// on the blocking pool.
    pub async fn blocking<F, T>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> Result<T, AppError> + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(f).await.map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            AppError::Internal(e.to_string())
        })?
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
