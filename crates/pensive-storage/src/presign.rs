use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use url::Url;

use crate::{ObjectStoreError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Presigned URLs live for one day unless the caller asks otherwise.
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Default)]
pub struct PresignOptions {
    pub expiry: Option<Duration>,
    /// `Content-Disposition` the download should be served with.
    /// Defaults to an attachment named after the object.
    pub response_disposition: Option<String>,
}

/// Query string carried by a presigned URL.
#[derive(Debug, Clone, Deserialize)]
pub struct PresignedQuery {
    #[serde(rename = "X-Expires")]
    pub expires: i64,
    #[serde(rename = "response-content-disposition", default)]
    pub disposition: String,
    #[serde(rename = "X-Signature")]
    pub signature: String,
}

pub(crate) struct Signer {
    mac: HmacSha256,
    base: Url,
}

impl Signer {
    pub(crate) fn new(key: &[u8], base: Url) -> Result<Self> {
        if base.cannot_be_a_base() {
            return Err(ObjectStoreError::Url(base.to_string()));
        }
        let mac = HmacSha256::new_from_slice(key).map_err(|_| ObjectStoreError::SigningKey)?;
        Ok(Self { mac, base })
    }

    fn mac_for(&self, bucket: &str, key: &str, expires: i64, disposition: &str) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(b"GET\n");
        mac.update(bucket.as_bytes());
        mac.update(b"\n");
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac.update(b"\n");
        mac.update(disposition.as_bytes());
        mac
    }

    pub(crate) fn presign(&self, bucket: &str, key: &str, opts: &PresignOptions) -> Result<Url> {
        let expiry = opts.expiry.unwrap_or(DEFAULT_EXPIRY);
        let expires = Utc::now().timestamp() + expiry.as_secs() as i64;
        let disposition = opts
            .response_disposition
            .clone()
            .unwrap_or_else(|| attachment(key));

        let signature = hex::encode(
            self.mac_for(bucket, key, expires, &disposition)
                .finalize()
                .into_bytes(),
        );

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ObjectStoreError::Url(self.base.to_string()))?
            .pop_if_empty()
            .push("media")
            .push(bucket)
            .extend(key.split('/'));
        url.query_pairs_mut()
            .append_pair("X-Expires", &expires.to_string())
            .append_pair("response-content-disposition", &disposition)
            .append_pair("X-Signature", &signature);

        Ok(url)
    }

    /// Signature first, so a forged expiry reads as tampering rather than expiry.
    pub(crate) fn verify(&self, bucket: &str, key: &str, query: &PresignedQuery) -> Result<()> {
        let signature = hex::decode(&query.signature).map_err(|_| ObjectStoreError::BadSignature)?;
        self.mac_for(bucket, key, query.expires, &query.disposition)
            .verify_slice(&signature)
            .map_err(|_| ObjectStoreError::BadSignature)?;

        if Utc::now().timestamp() > query.expires {
            return Err(ObjectStoreError::Expired);
        }
        Ok(())
    }
}

/// `attachment; filename="<last path segment>"`
pub fn attachment(key: &str) -> String {
    let name = key.rsplit('/').next().unwrap_or(key).replace('"', "");
    format!("attachment; filename=\"{name}\"")
}
