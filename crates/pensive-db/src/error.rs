use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username taken")]
    UsernameTaken,

    #[error("user not found")]
    UserNotFound,

    #[error("post not found")]
    PostNotFound,

    #[error("post needs a body or a media attachment")]
    EmptyPost,

    #[error("corrupt record {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("database lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    pub(crate) fn corrupt(key: &str, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
