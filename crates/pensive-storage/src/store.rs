use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use crate::presign::{PresignOptions, PresignedQuery, Signer};
use crate::{ObjectStoreError, Result};

const TMP_PREFIX: &str = ".pensive-tmp-";
const MAX_KEY_LEN: usize = 1024;

/// Bucket holding a user's uploads.
pub fn user_bucket(user_id: i64) -> String {
    format!("user{user_id}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadInfo {
    pub bucket: String,
    pub key: String,
    pub size: u64,
    pub content_type: String,
    /// Hex SHA-256 of the stored bytes.
    pub etag: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    pub bucket: String,
    /// Object key, or a `dir/` prefix in non-recursive listings.
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub is_prefix: bool,
}

/// Buckets are directories under `root`, objects are files inside them.
///
/// Keys may contain `/`; each segment becomes a directory level.
pub struct ObjectStore {
    root: PathBuf,
    signer: Signer,
}

impl ObjectStore {
    pub async fn new(root: PathBuf, signing_key: &[u8], public_url: Url) -> Result<Self> {
        fs::create_dir_all(&root).await?;
        info!("Object store root: {}", root.display());
        let signer = Signer::new(signing_key, public_url)?;
        Ok(Self { root, signer })
    }

    fn bucket_path(&self, bucket: &str) -> Result<PathBuf> {
        validate_bucket(bucket)?;
        Ok(self.root.join(bucket))
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        let mut path = self.bucket_path(bucket)?;
        path.extend(key.split('/'));
        Ok(path)
    }

    pub async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        let path = self.bucket_path(bucket)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Create `bucket` unless it already exists.
    pub async fn make_bucket(&self, bucket: &str) -> Result<()> {
        let path = self.bucket_path(bucket)?;
        if self.bucket_exists(bucket).await? {
            debug!("We already own {}", bucket);
            return Ok(());
        }
        fs::create_dir_all(&path).await?;
        info!("Successfully created {}", bucket);
        Ok(())
    }

    /// Stream `reader` into `bucket/key`.
    ///
    /// Bytes land in a temporary file first and are renamed into place once
    /// the full `size` has been read, so readers never see partial objects.
    pub async fn put<R>(
        &self,
        bucket: &str,
        key: &str,
        mut reader: R,
        size: u64,
        content_type: &str,
    ) -> Result<UploadInfo>
    where
        R: AsyncRead + Unpin,
    {
        let dest = self.object_path(bucket, key)?;
        if !self.bucket_exists(bucket).await? {
            return Err(ObjectStoreError::NoSuchBucket(bucket.to_string()));
        }
        let parent = dest.parent().unwrap_or(&self.root).to_path_buf();
        fs::create_dir_all(&parent).await?;

        let tmp = parent.join(format!("{TMP_PREFIX}{}", Uuid::new_v4()));
        let written = write_hashed(&tmp, &mut reader).await;
        let (actual, etag) = match written {
            Ok(done) => done,
            Err(e) => {
                let _ = fs::remove_file(&tmp).await;
                return Err(e);
            }
        };

        if actual != size {
            let _ = fs::remove_file(&tmp).await;
            return Err(ObjectStoreError::SizeMismatch { expected: size, actual });
        }

        fs::rename(&tmp, &dest).await?;
        debug!("Stored {}/{} ({} bytes)", bucket, key, actual);

        Ok(UploadInfo {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size: actual,
            content_type: content_type.to_string(),
            etag,
        })
    }

    pub async fn get(&self, bucket: &str, key: &str) -> Result<fs::File> {
        let path = self.object_path(bucket, key)?;
        match fs::File::open(&path).await {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(not_found(bucket, key)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn stat(&self, bucket: &str, key: &str) -> Result<ObjectInfo> {
        let path = self.object_path(bucket, key)?;
        let meta = match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Err(not_found(bucket, key)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(not_found(bucket, key));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(object_info(bucket, key.to_string(), &meta, false))
    }

    pub fn presign(&self, bucket: &str, key: &str, opts: &PresignOptions) -> Result<Url> {
        validate_bucket(bucket)?;
        validate_key(key)?;
        self.signer.presign(bucket, key, opts)
    }

    pub fn verify_presigned(&self, bucket: &str, key: &str, query: &PresignedQuery) -> Result<()> {
        validate_bucket(bucket)?;
        validate_key(key)?;
        self.signer.verify(bucket, key, query)
    }

    /// Bucket names, sorted.
    pub async fn list_buckets(&self) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut buckets = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if validate_bucket(name).is_ok() {
                    buckets.push(name.to_string());
                }
            }
        }
        buckets.sort();
        Ok(buckets)
    }

    /// Objects in `bucket`, sorted by key. Without `recursive`, nested
    /// directories are reported once as `dir/` prefixes.
    pub async fn list_objects(&self, bucket: &str, recursive: bool) -> Result<Vec<ObjectInfo>> {
        let base = self.bucket_path(bucket)?;
        if !self.bucket_exists(bucket).await? {
            return Err(ObjectStoreError::NoSuchBucket(bucket.to_string()));
        }

        let mut objects = Vec::new();
        let mut pending = vec![(base, String::new())];
        while let Some((dir, prefix)) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                if name.starts_with('.') {
                    continue;
                }
                let key = format!("{prefix}{name}");
                let meta = entry.metadata().await?;
                if meta.is_dir() {
                    if recursive {
                        pending.push((entry.path(), format!("{key}/")));
                    } else {
                        objects.push(object_info(bucket, format!("{key}/"), &meta, true));
                    }
                } else {
                    objects.push(object_info(bucket, key, &meta, false));
                }
            }
        }
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    pub async fn list_all(&self, recursive: bool) -> Result<Vec<ObjectInfo>> {
        let mut all = Vec::new();
        for bucket in self.list_buckets().await? {
            all.extend(self.list_objects(&bucket, recursive).await?);
        }
        Ok(all)
    }
}

async fn write_hashed<R>(path: &Path, reader: &mut R) -> Result<(u64, String)>
where
    R: AsyncRead + Unpin,
{
    let mut file = fs::File::create(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        file.write_all(&buf[..n]).await?;
        total += n as u64;
    }
    file.flush().await?;
    Ok((total, hex::encode(hasher.finalize())))
}

fn object_info(bucket: &str, key: String, meta: &std::fs::Metadata, is_prefix: bool) -> ObjectInfo {
    let last_modified = meta
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    ObjectInfo {
        bucket: bucket.to_string(),
        key,
        size: if is_prefix { 0 } else { meta.len() },
        last_modified,
        is_prefix,
    }
}

fn not_found(bucket: &str, key: &str) -> ObjectStoreError {
    ObjectStoreError::NotFound {
        bucket: bucket.to_string(),
        key: key.to_string(),
    }
}

/// 3-63 chars of lowercase ASCII letters, digits and `-`, not starting
/// with `-`.
fn validate_bucket(bucket: &str) -> Result<()> {
    let ok = (3..=63).contains(&bucket.len())
        && !bucket.starts_with('-')
        && bucket
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    if ok {
        Ok(())
    } else {
        Err(ObjectStoreError::InvalidBucket(bucket.to_string()))
    }
}

fn validate_key(key: &str) -> Result<()> {
    let ok = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && !key.contains(['\\', '\0'])
        && key
            .split('/')
            .all(|seg| !seg.is_empty() && !seg.starts_with('.'));
    if ok {
        Ok(())
    } else {
        Err(ObjectStoreError::InvalidKey(key.to_string()))
    }
}
