//! Record <-> hash conversions.
//!
//! Hash values are strings; timestamps are RFC 3339, booleans are
//! `"true"` / `"false"`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use pensive_types::{Post, User};

use crate::{Result, StoreError};

/// Individually addressable fields of a `user:<id>` hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserField {
    Username,
    Password,
    Email,
    IsVerified,
    CreatedAt,
    UpdatedAt,
}

impl UserField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::Password => "password",
            Self::Email => "email",
            Self::IsVerified => "is_verified",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

pub fn flag(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

struct Fields<'a> {
    key: &'a str,
    map: HashMap<String, String>,
}

impl Fields<'_> {
    fn take(&mut self, field: &str) -> Result<String> {
        self.map
            .remove(field)
            .ok_or_else(|| StoreError::corrupt(self.key, format!("missing field {field}")))
    }

    fn int(&mut self, field: &str) -> Result<i64> {
        let raw = self.take(field)?;
        raw.parse()
            .map_err(|_| StoreError::corrupt(self.key, format!("{field} is not an integer: {raw}")))
    }

    fn time(&mut self, field: &str) -> Result<DateTime<Utc>> {
        let raw = self.take(field)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| StoreError::corrupt(self.key, format!("{field}: {e}")))
    }
}

/// Build a `User` from a `user:<id>` hash. An empty hash means the user does
/// not exist.
pub fn user_from_hash(key: &str, map: HashMap<String, String>) -> Result<User> {
    if map.is_empty() {
        return Err(StoreError::UserNotFound);
    }
    let mut f = Fields { key, map };

    Ok(User {
        id: f.int("id")?,
        username: f.take("username")?,
        password_hash: f.take("password")?,
        email: f.take("email").unwrap_or_default(),
        is_verified: f.take("is_verified").is_ok_and(|v| v == "true"),
        created_at: f.time("created_at")?,
        updated_at: f.time("updated_at")?,
    })
}

pub fn post_from_hash(key: &str, map: HashMap<String, String>) -> Result<Post> {
    if map.is_empty() {
        return Err(StoreError::PostNotFound);
    }
    let mut f = Fields { key, map };

    let media_id = f.take("media_id").unwrap_or_default();
    Ok(Post {
        id: f.int("id")?,
        user_id: f.int("user_id")?,
        body: f.take("body").unwrap_or_default(),
        media_id: (!media_id.is_empty()).then_some(media_id),
        created_at: f.time("created_at")?,
        updated_at: f.time("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn decodes_user() {
        let now = timestamp(Utc::now());
        let user = user_from_hash(
            "user:3",
            hash(&[
                ("id", "3"),
                ("username", "ada"),
                ("password", "$argon2id$x"),
                ("email", "ada@example.com"),
                ("is_verified", "true"),
                ("created_at", &now),
                ("updated_at", &now),
            ]),
        )
        .unwrap();
        assert_eq!(user.id, 3);
        assert_eq!(user.username, "ada");
        assert!(user.is_verified);
    }

    #[test]
    fn empty_hash_is_not_found() {
        assert!(matches!(
            user_from_hash("user:9", HashMap::new()),
            Err(StoreError::UserNotFound)
        ));
        assert!(matches!(
            post_from_hash("post:9", HashMap::new()),
            Err(StoreError::PostNotFound)
        ));
    }

    #[test]
    fn bad_fields_are_corrupt() {
        let err = post_from_hash("post:1", hash(&[("id", "one")])).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn empty_media_id_decodes_as_none() {
        let now = timestamp(Utc::now());
        let post = post_from_hash(
            "post:1",
            hash(&[
                ("id", "1"),
                ("user_id", "2"),
                ("body", "hi"),
                ("media_id", ""),
                ("created_at", &now),
                ("updated_at", &now),
            ]),
        )
        .unwrap();
        assert_eq!(post.media_id, None);
    }
}
