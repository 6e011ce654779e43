use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;
use tracing::{debug, error};

use pensive_storage::{ObjectStoreError, PresignedQuery, content_type, user_bucket};

use crate::auth::CurrentUser;
use crate::state::AppState;

fn status_of(err: &ObjectStoreError) -> StatusCode {
    match err {
        ObjectStoreError::InvalidBucket(_) | ObjectStoreError::InvalidKey(_) => {
            StatusCode::BAD_REQUEST
        }
        ObjectStoreError::NotFound { .. } | ObjectStoreError::NoSuchBucket(_) => {
            StatusCode::NOT_FOUND
        }
        ObjectStoreError::Expired | ObjectStoreError::BadSignature => StatusCode::FORBIDDEN,
        other => {
            error!("object store error: {}", other);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Stream `bucket/key` with the given headers.
async fn stream_object(
    state: &AppState,
    bucket: &str,
    key: &str,
    mut headers: HeaderMap,
) -> Result<Response, StatusCode> {
    let info = state.objects.stat(bucket, key).await.map_err(|e| status_of(&e))?;
    let file = state.objects.get(bucket, key).await.map_err(|e| status_of(&e))?;

    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(info.size));
    let body = Body::from_stream(ReaderStream::new(file));
    Ok((StatusCode::OK, headers, body).into_response())
}

/// GET /media/{bucket}/{*key}: serve an object through a presigned URL.
/// Expired or tampered links are refused.
pub async fn presigned(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    Query(query): Query<PresignedQuery>,
) -> Result<Response, StatusCode> {
    state
        .objects
        .verify_presigned(&bucket, &key, &query)
        .map_err(|e| {
            debug!("refusing {}/{}: {}", bucket, key, e);
            status_of(&e)
        })?;

    let mut headers = HeaderMap::new();
    let mime = match content_type(&key) {
        "none" => "application/octet-stream",
        mime => mime,
    };
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(mime));
    if !query.disposition.is_empty() {
        let disposition =
            HeaderValue::from_str(&query.disposition).map_err(|_| StatusCode::BAD_REQUEST)?;
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }

    stream_object(&state, &bucket, &key, headers).await
}

/// GET /files/{*key}: stream an object from the caller's own bucket.
pub async fn own_file(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(key): Path<String>,
) -> Result<Response, StatusCode> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    stream_object(&state, &user_bucket(user.id), &key, headers).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_statuses() {
        assert_eq!(status_of(&ObjectStoreError::Expired), StatusCode::FORBIDDEN);
        assert_eq!(status_of(&ObjectStoreError::BadSignature), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(&ObjectStoreError::InvalidKey("../x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(&ObjectStoreError::NotFound {
                bucket: "user1".into(),
                key: "x".into()
            }),
            StatusCode::NOT_FOUND
        );
    }
}
