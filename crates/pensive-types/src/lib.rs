//! Shared domain models and form payloads for Pensive.

pub mod api;
pub mod models;

pub use models::{NewPost, Post, User, UserUpdate};
