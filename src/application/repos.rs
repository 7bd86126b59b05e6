//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{CommentRecord, PostRecord, UserRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub title: String,
    pub body: String,
}

/// The authoritative post store. Soft-deleted posts are invisible to every read.
#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Posts ordered by ascending id, skipping `offset` and returning at most `limit`.
    async fn list_page(&self, offset: u64, limit: u32) -> Result<Vec<PostRecord>, RepoError>;

    async fn list_all(&self) -> Result<Vec<PostRecord>, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError>;

    /// Case-insensitive substring match over title or body.
    async fn search(&self, query: &str) -> Result<Vec<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    /// Marks the post deleted. Returns [`RepoError::NotFound`] when no live post has `id`.
    async fn soft_delete_post(&self, id: i64) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub username: String,
    pub password_hash: String,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentRecord>, RepoError>;

    async fn create_comment(&self, post_id: i64, body: String)
    -> Result<CommentRecord, RepoError>;
}

#[async_trait]
pub trait LikesRepo: Send + Sync {
    async fn count_likes(&self, post_id: i64) -> Result<u64, RepoError>;

    /// Records a like. Returns `false` when `user_id` already liked the post.
    async fn add_like(&self, post_id: i64, user_id: i64) -> Result<bool, RepoError>;
}
