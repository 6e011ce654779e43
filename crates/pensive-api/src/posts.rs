use axum::{
    extract::{Multipart, Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::{debug, info};

use pensive_db::StoreError;
use pensive_storage::{content_type, user_bucket};
use pensive_types::NewPost;

use crate::auth::CurrentUser;
use crate::error::{AppError, Fallback, OrRedirect};
use crate::feed;
use crate::state::AppState;
use crate::templates::{HomeTemplate, render};

/// 50 MB upload limit for post attachments
pub const MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024;

/// GET /: global feed.
pub async fn home(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, AppError> {
    let posts = feed::load(&state, None).await?;
    render(&HomeTemplate {
        title: "Posts",
        name: format!("@{}", user.username),
        display_form: true,
        posts,
    })
}

/// GET /@{username}: one user's posts. Paths without the `@` or naming an
/// unknown user go back to the global feed.
pub async fn profile(
    State(state): State<AppState>,
    CurrentUser(_viewer): CurrentUser,
    Path(handle): Path<String>,
) -> Result<Response, Fallback> {
    let Some(username) = handle.strip_prefix('@').map(str::to_string) else {
        debug!("no profile route for /{}", handle);
        return Ok(Redirect::to("/").into_response());
    };

    let owner = state
        .db(move |db| db.get_user_by_name(&username))
        .await
        .or_redirect("/")?;
    let posts = feed::load(&state, Some(owner.id)).await.or_redirect("/")?;

    let page = render(&HomeTemplate {
        title: "Posts",
        name: format!("@{}", owner.username),
        display_form: true,
        posts,
    })
    .or_redirect("/")?;
    Ok(page.into_response())
}

/// POST /post: multipart `post` text plus an optional `media-source` file.
/// Files always land in the poster's own bucket.
pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Result<Redirect, Fallback> {
    let mut body = String::new();
    let mut media_id = None;

    while let Some(field) = multipart.next_field().await.or_redirect("/")? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "post" => body = field.text().await.or_redirect("/")?,
            "media-source" => {
                let filename = field.file_name().map(sanitize_filename).unwrap_or_default();
                let bytes = field.bytes().await.or_redirect("/")?;
                // browsers send an empty part when no file was picked
                if filename.is_empty() || bytes.is_empty() {
                    continue;
                }

                // object key is the file name; a re-upload replaces the old object
                let bucket = user_bucket(user.id);
                state.objects.make_bucket(&bucket).await.or_redirect("/")?;
                let upload = state
                    .objects
                    .put(
                        &bucket,
                        &filename,
                        &bytes[..],
                        bytes.len() as u64,
                        content_type(&filename),
                    )
                    .await
                    .or_redirect("/")?;
                info!(
                    "@{} uploaded {}/{} ({} bytes)",
                    user.username, bucket, upload.key, upload.size
                );
                media_id = Some(upload.key);
            }
            _ => {}
        }
    }

    let new = NewPost {
        user_id: user.id,
        body,
        media_id,
    };
    if new.is_empty() {
        return Err(Fallback::new(StoreError::EmptyPost, "/"));
    }
    let post = state.db(move |db| db.add_post(&new)).await.or_redirect("/")?;
    debug!("@{} posted {}", user.username, post.id);
    Ok(Redirect::to("/"))
}

/// Last path component with anything outside `[A-Za-z0-9._-]` replaced.
fn sanitize_filename(raw: &str) -> String {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}
