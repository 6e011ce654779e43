use thiserror::Error;

pub type Result<T> = std::result::Result<T, ObjectStoreError>;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("invalid bucket name: {0:?}")]
    InvalidBucket(String),

    #[error("invalid object key: {0:?}")]
    InvalidKey(String),

    #[error("bucket {0} does not exist")]
    NoSuchBucket(String),

    #[error("object {bucket}/{key} not found")]
    NotFound { bucket: String, key: String },

    #[error("upload size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("presigned url expired")]
    Expired,

    #[error("presigned url signature mismatch")]
    BadSignature,

    #[error("invalid signing key")]
    SigningKey,

    #[error("cannot build url from {0}")]
    Url(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
