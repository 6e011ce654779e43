use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// PHC-formatted password hash. Never rendered or serialized out.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub email: String,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub body: String,
    /// Object key inside the owner's bucket.
    pub media_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub user_id: i64,
    pub body: String,
    pub media_id: Option<String>,
}

impl NewPost {
    /// A post must carry text or an attachment.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty() && self.media_id.as_deref().is_none_or(str::is_empty)
    }
}

/// Partial account update. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_post_detection() {
        let mut post = NewPost {
            user_id: 1,
            ..Default::default()
        };
        assert!(post.is_empty());

        post.media_id = Some(String::new());
        assert!(post.is_empty());

        post.media_id = Some("cat.jpg".into());
        assert!(!post.is_empty());

        let text_only = NewPost {
            user_id: 1,
            body: "hello".into(),
            media_id: None,
        };
        assert!(!text_only.is_empty());
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let now = Utc::now();
        let user = User {
            id: 7,
            username: "ada".into(),
            password_hash: "$argon2id$secret".into(),
            email: "ada@example.com".into(),
            is_verified: false,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"username\":\"ada\""));
    }
}
