use chrono::Utc;
use pensive_types::{NewPost, Post, User, UserUpdate};
use rusqlite::Connection;
use tracing::debug;

use crate::models::{self, UserField, flag, timestamp};
use crate::{Database, Result, StoreError, keys, kv};

/// Feeds show at most this many posts.
pub const FEED_LIMIT: usize = 10;

impl Database {
    // -- Users --

    /// Create a user. The username index entry is claimed with an
    /// insert-if-absent in the same transaction that allocates the id and
    /// writes the record, so two concurrent registrations cannot both win.
    pub fn add_user(&self, username: &str, password_hash: &str, email: &str) -> Result<User> {
        let now = Utc::now();
        let at = timestamp(now);

        let id = self.with_tx(|tx| {
            let id = kv::incr(tx, keys::USER_NEXT_ID)?;
            if !kv::hsetnx(tx, keys::USER_BY_USERNAME, username, &id.to_string())? {
                return Err(StoreError::UsernameTaken);
            }

            let key = keys::user(id);
            kv::hset(tx, &key, "id", &id.to_string())?;
            kv::hset(tx, &key, UserField::Username.as_str(), username)?;
            kv::hset(tx, &key, UserField::Password.as_str(), password_hash)?;
            kv::hset(tx, &key, UserField::Email.as_str(), email)?;
            kv::hset(tx, &key, UserField::IsVerified.as_str(), flag(false))?;
            kv::hset(tx, &key, UserField::CreatedAt.as_str(), &at)?;
            kv::hset(tx, &key, UserField::UpdatedAt.as_str(), &at)?;
            Ok(id)
        })?;

        debug!("Created user {} (@{})", id, username);
        Ok(User {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            email: email.to_string(),
            is_verified: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_user(&self, id: i64) -> Result<User> {
        self.with_conn(|conn| query_user(conn, id))
    }

    /// Look a user up through the username index. An absent index entry is
    /// `UserNotFound`; anything else is a store failure.
    pub fn get_user_by_name(&self, username: &str) -> Result<User> {
        self.with_conn(|conn| {
            let raw = kv::hget(conn, keys::USER_BY_USERNAME, username)?
                .ok_or(StoreError::UserNotFound)?;
            let id: i64 = raw.parse().map_err(|_| {
                StoreError::corrupt(keys::USER_BY_USERNAME, format!("{username} -> {raw}"))
            })?;
            query_user(conn, id)
        })
    }

    /// Single-field read. `None` when the field (or the user) is absent.
    pub fn user_field(&self, id: i64, field: UserField) -> Result<Option<String>> {
        self.with_conn(|conn| kv::hget(conn, &keys::user(id), field.as_str()))
    }

    /// Single-field write. Username changes are routed through
    /// [`Database::update_user`] so the index stays in step.
    pub fn set_user_field(&self, id: i64, field: UserField, value: &str) -> Result<()> {
        if field == UserField::Username {
            return self.update_user(
                id,
                &UserUpdate {
                    username: Some(value.to_string()),
                    ..Default::default()
                },
            );
        }
        self.with_conn(|conn| {
            let key = keys::user(id);
            if !kv::hexists(conn, &key)? {
                return Err(StoreError::UserNotFound);
            }
            kv::hset(conn, &key, field.as_str(), value)
        })
    }

    pub fn update_user(&self, id: i64, update: &UserUpdate) -> Result<()> {
        let at = timestamp(Utc::now());

        self.with_tx(|tx| {
            let key = keys::user(id);
            if !kv::hexists(tx, &key)? {
                return Err(StoreError::UserNotFound);
            }

            if let Some(new_name) = &update.username {
                let old_name = kv::hget(tx, &key, UserField::Username.as_str())?;
                if old_name.as_deref() != Some(new_name.as_str()) {
                    claim_username(tx, new_name, id)?;
                    if let Some(old) = old_name {
                        kv::hdel(tx, keys::USER_BY_USERNAME, &old)?;
                    }
                    kv::hset(tx, &key, UserField::Username.as_str(), new_name)?;
                }
            }
            if let Some(hash) = &update.password_hash {
                kv::hset(tx, &key, UserField::Password.as_str(), hash)?;
            }
            if let Some(email) = &update.email {
                kv::hset(tx, &key, UserField::Email.as_str(), email)?;
            }

            kv::hset(tx, &key, UserField::UpdatedAt.as_str(), &at)
        })
    }

    /// Move an account from unverified to verified. Returns `false` when it
    /// was already verified; there is no way back.
    pub fn mark_verified(&self, id: i64) -> Result<bool> {
        let at = timestamp(Utc::now());

        self.with_tx(|tx| {
            let key = keys::user(id);
            let current = kv::hget(tx, &key, UserField::IsVerified.as_str())?
                .ok_or(StoreError::UserNotFound)?;
            if current == flag(true) {
                return Ok(false);
            }
            kv::hset(tx, &key, UserField::IsVerified.as_str(), flag(true))?;
            kv::hset(tx, &key, UserField::UpdatedAt.as_str(), &at)?;
            Ok(true)
        })
    }

    // -- Posts --

    pub fn add_post(&self, new: &NewPost) -> Result<Post> {
        if new.is_empty() {
            return Err(StoreError::EmptyPost);
        }

        let now = Utc::now();
        let at = timestamp(now);
        let media_id = new.media_id.clone().filter(|m| !m.is_empty());

        let id = self.with_tx(|tx| {
            if !kv::hexists(tx, &keys::user(new.user_id))? {
                return Err(StoreError::UserNotFound);
            }

            let id = kv::incr(tx, keys::POST_NEXT_ID)?;
            let key = keys::post(id);
            kv::hset(tx, &key, "id", &id.to_string())?;
            kv::hset(tx, &key, "user_id", &new.user_id.to_string())?;
            kv::hset(tx, &key, "body", &new.body)?;
            kv::hset(tx, &key, "media_id", media_id.as_deref().unwrap_or_default())?;
            kv::hset(tx, &key, "created_at", &at)?;
            kv::hset(tx, &key, "updated_at", &at)?;
            kv::lpush(tx, keys::POSTS, &id.to_string())?;
            kv::lpush(tx, &keys::user_posts(new.user_id), &id.to_string())?;
            Ok(id)
        })?;

        debug!("Created post {} for user {}", id, new.user_id);
        Ok(Post {
            id,
            user_id: new.user_id,
            body: new.body.clone(),
            media_id,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_post(&self, id: i64) -> Result<Post> {
        self.with_conn(|conn| query_post(conn, id))
    }

    /// Newest posts across all users.
    pub fn get_all_posts(&self) -> Result<Vec<Post>> {
        self.with_conn(|conn| query_posts(conn, keys::POSTS))
    }

    /// Newest posts of a single user.
    pub fn get_posts(&self, user_id: i64) -> Result<Vec<Post>> {
        self.with_conn(|conn| query_posts(conn, &keys::user_posts(user_id)))
    }
}

/// Point the username index at `id`, unless another user already holds it.
fn claim_username(conn: &Connection, username: &str, id: i64) -> Result<()> {
    let id_str = id.to_string();
    if kv::hsetnx(conn, keys::USER_BY_USERNAME, username, &id_str)? {
        return Ok(());
    }
    match kv::hget(conn, keys::USER_BY_USERNAME, username)? {
        Some(owner) if owner == id_str => Ok(()),
        _ => Err(StoreError::UsernameTaken),
    }
}

fn query_user(conn: &Connection, id: i64) -> Result<User> {
    let key = keys::user(id);
    let map = kv::hgetall(conn, &key)?;
    models::user_from_hash(&key, map)
}

fn query_post(conn: &Connection, id: i64) -> Result<Post> {
    let key = keys::post(id);
    let map = kv::hgetall(conn, &key)?;
    models::post_from_hash(&key, map)
}

fn query_posts(conn: &Connection, list_key: &str) -> Result<Vec<Post>> {
    kv::lrange(conn, list_key, FEED_LIMIT)?
        .into_iter()
        .map(|raw| {
            let id: i64 = raw
                .parse()
                .map_err(|_| StoreError::corrupt(list_key, format!("bad post id {raw}")))?;
            query_post(conn, id)
        })
        .collect()
}
