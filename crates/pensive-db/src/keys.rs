//! Key layout of the record store.

pub const USER_NEXT_ID: &str = "user:next-id";
pub const USER_BY_USERNAME: &str = "user:by-username";
pub const POST_NEXT_ID: &str = "post:next-id";
/// Global post list, newest first.
pub const POSTS: &str = "posts";

pub fn user(id: i64) -> String {
    format!("user:{id}")
}

pub fn user_posts(id: i64) -> String {
    format!("user:{id}:posts")
}

pub fn post(id: i64) -> String {
    format!("post:{id}")
}
