use std::collections::HashMap;

use serde::Serialize;

use pensive_db::Database;
use pensive_storage::{
    MediaKind, ObjectStore, PresignOptions, media_kind, presign::attachment, user_bucket,
};
use pensive_types::Post;

use crate::error::AppError;
use crate::state::AppState;

/// `02 Jan 06 15:04 -0700`
const TIME_FORMAT: &str = "%d %b %y %H:%M %z";

/// A post as the feed template shows it.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub author: String,
    pub body: String,
    /// Presigned download link, empty when the post has no media.
    pub attachment_url: String,
    pub attachment_kind: MediaKind,
    pub updated_at: String,
}

/// Global feed, or one user's posts when `author` is set.
pub async fn load(state: &AppState, author: Option<i64>) -> Result<Vec<PostView>, AppError> {
    let db = state.db.clone();
    let objects = state.objects.clone();
    state
        .blocking(move || {
            let posts = match author {
                Some(id) => db.get_posts(id)?,
                None => db.get_all_posts()?,
            };
            assemble(&db, &objects, posts)
        })
        .await
}

pub fn assemble(
    db: &Database,
    objects: &ObjectStore,
    posts: Vec<Post>,
) -> Result<Vec<PostView>, AppError> {
    let mut authors: HashMap<i64, String> = HashMap::new();
    let mut views = Vec::with_capacity(posts.len());

    for post in posts {
        let author = match authors.get(&post.user_id) {
            Some(name) => name.clone(),
            None => {
                let name = db.get_user(post.user_id)?.username;
                authors.insert(post.user_id, name.clone());
                name
            }
        };

        let media_id = post.media_id.unwrap_or_default();
        let attachment_url = if media_id.is_empty() {
            String::new()
        } else {
            let opts = PresignOptions {
                response_disposition: Some(attachment(&media_id)),
                ..Default::default()
            };
            objects
                .presign(&user_bucket(post.user_id), &media_id, &opts)?
                .to_string()
        };

        views.push(PostView {
            author,
            body: post.body,
            attachment_url,
            attachment_kind: media_kind(&media_id),
            updated_at: post.updated_at.format(TIME_FORMAT).to_string(),
        });
    }

    Ok(views)
}
