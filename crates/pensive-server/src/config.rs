use std::{fmt::Display, path::PathBuf, str::FromStr};

use anyhow::{Context, Result, anyhow, bail};
use tracing::{info, warn};
use url::Url;

use pensive_crypto::keys::{generate_secret, secret_from_base64};

/// Access secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "soopa-shiikurrets-too",
];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub public_url: Url,
    pub db_path: PathBuf,
    pub media_dir: PathBuf,
    pub static_dir: PathBuf,
    pub session_key: Vec<u8>,
    pub media_key: Vec<u8>,
    pub access_secret: String,
    pub smtp: Smtp,
}

pub struct Smtp {
    pub host: String,
    pub user: String,
    /// Empty means mail is logged instead of sent.
    pub password: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::load(|key| std::env::var(key).ok())
    }

    /// Build the config from any variable source. Unset and empty values
    /// fall back to defaults.
    pub fn load(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let access_secret = var("PENSIVE_ACCESS_SECRET").unwrap_or_default();
        if access_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&access_secret.as_str()) {
            bail!(
                "FATAL: PENSIVE_ACCESS_SECRET is unset or still a placeholder. \
                 Set it in your .env file and restart."
            );
        }

        Ok(Self {
            host: try_load(&var, "PENSIVE_HOST", "0.0.0.0")?,
            port: try_load(&var, "PENSIVE_PORT", "8000")?,
            public_url: try_load(&var, "PENSIVE_PUBLIC_URL", "http://localhost:8000")?,
            db_path: try_load(&var, "PENSIVE_DB_PATH", "pensive.db")?,
            media_dir: try_load(&var, "PENSIVE_MEDIA_DIR", "./media")?,
            static_dir: try_load(&var, "PENSIVE_STATIC_DIR", "./static")?,
            session_key: load_key(&var, "PENSIVE_SESSION_KEY")?,
            media_key: load_key(&var, "PENSIVE_MEDIA_KEY")?,
            access_secret,
            smtp: Smtp {
                host: try_load(&var, "PENSIVE_SMTP_HOST", "smtp.gmail.com")?,
                user: try_load(&var, "PENSIVE_SMTP_USER", "example@example.com")?,
                password: var("PENSIVE_SMTP_PASSWORD").unwrap_or_default(),
            },
        })
    }
}

fn try_load<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse().map_err(|e| anyhow!("Invalid {key} value {raw:?}: {e}"))
}

/// A base64 key from the environment, or a fresh random one when unset.
fn load_key(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Vec<u8>> {
    match var(key) {
        Some(encoded) => secret_from_base64(&encoded).with_context(|| format!("Invalid {key}")),
        None => {
            warn!("{key} not set, generated a random one; it will not survive a restart");
            Ok(generate_secret().to_vec())
        }
    }
}
