//! Local object store for user media.
//!
//! Buckets are directories under a root, objects are files inside them.
//! Reads by other users go through HMAC-signed, expiring URLs.

pub mod error;
pub mod media;
pub mod presign;
pub mod store;

pub use error::{ObjectStoreError, Result};
pub use media::{MediaKind, content_type, media_kind};
pub use presign::{DEFAULT_EXPIRY, PresignOptions, PresignedQuery};
pub use store::{ObjectInfo, ObjectStore, UploadInfo, user_bucket};
