//! Comments and likes attached to live posts.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::application::repos::{CommentsRepo, LikesRepo, PostsRepo, RepoError};
use crate::domain::entities::CommentRecord;
use crate::domain::error::DomainError;
use crate::domain::posts::comment_body;

#[derive(Debug, Error)]
pub enum EngagementError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeSummary {
    pub post_id: i64,
    pub likes: u64,
}

#[derive(Clone)]
pub struct EngagementService {
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
    likes: Arc<dyn LikesRepo>,
}

impl EngagementService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        comments: Arc<dyn CommentsRepo>,
        likes: Arc<dyn LikesRepo>,
    ) -> Self {
        Self {
            posts,
            comments,
            likes,
        }
    }

    pub async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentRecord>, EngagementError> {
        self.ensure_post(post_id).await?;
        Ok(self.comments.list_comments(post_id).await?)
    }

    pub async fn add_comment(
        &self,
        post_id: i64,
        body: &str,
    ) -> Result<CommentRecord, EngagementError> {
        let body = comment_body(body)?;
        self.ensure_post(post_id).await?;
        let comment = self.comments.create_comment(post_id, body).await?;
        info!(
            target = "scribe::engagement",
            post_id,
            comment_id = comment.id,
            "comment added"
        );
        Ok(comment)
    }

    pub async fn count_likes(&self, post_id: i64) -> Result<LikeSummary, EngagementError> {
        self.ensure_post(post_id).await?;
        let likes = self.likes.count_likes(post_id).await?;
        Ok(LikeSummary { post_id, likes })
    }

    /// Liking twice leaves the count unchanged.
    pub async fn add_like(&self, post_id: i64, user_id: i64) -> Result<LikeSummary, EngagementError> {
        self.ensure_post(post_id).await?;
        let inserted = self.likes.add_like(post_id, user_id).await?;
        if inserted {
            info!(target = "scribe::engagement", post_id, user_id, "post liked");
        }
        let likes = self.likes.count_likes(post_id).await?;
        Ok(LikeSummary { post_id, likes })
    }

    async fn ensure_post(&self, post_id: i64) -> Result<(), EngagementError> {
        match self.posts.find_by_id(post_id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::not_found("post").into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::repos::{CreatePostParams, PostsWriteRepo};
    use crate::infra::memory::InMemoryRepositories;

    async fn service_with_post() -> (EngagementService, Arc<InMemoryRepositories>, i64) {
        let repos = Arc::new(InMemoryRepositories::new());
        let post = repos
            .create_post(CreatePostParams {
                title: "Hello".into(),
                body: "World".into(),
            })
            .await
            .expect("seed post");
        let service = EngagementService::new(repos.clone(), repos.clone(), repos.clone());
        (service, repos, post.id)
    }

    #[tokio::test]
    async fn comments_are_listed_in_insertion_order() {
        let (service, _, post_id) = service_with_post().await;
        service.add_comment(post_id, "first").await.expect("comment");
        service.add_comment(post_id, " second ").await.expect("comment");

        let bodies: Vec<_> = service
            .list_comments(post_id)
            .await
            .expect("list")
            .into_iter()
            .map(|comment| comment.body)
            .collect();
        assert_eq!(bodies, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn comment_on_missing_post_is_not_found() {
        let (service, _, _) = service_with_post().await;
        assert!(matches!(
            service.add_comment(404, "hi").await,
            Err(EngagementError::Domain(DomainError::NotFound { .. }))
        ));
        assert!(matches!(
            service.add_comment(404, "").await,
            Err(EngagementError::Domain(DomainError::Validation { .. }))
        ));
    }

    #[tokio::test]
    async fn likes_are_idempotent_per_user() {
        let (service, _, post_id) = service_with_post().await;

        assert_eq!(service.add_like(post_id, 1).await.expect("like").likes, 1);
        assert_eq!(service.add_like(post_id, 1).await.expect("like").likes, 1);
        assert_eq!(service.add_like(post_id, 2).await.expect("like").likes, 2);
        assert_eq!(
            service.count_likes(post_id).await.expect("count"),
            LikeSummary { post_id, likes: 2 }
        );
    }

    #[tokio::test]
    async fn deleted_post_rejects_engagement() {
        let (service, repos, post_id) = service_with_post().await;
        repos.soft_delete_post(post_id).await.expect("delete");

        assert!(matches!(
            service.count_likes(post_id).await,
            Err(EngagementError::Domain(DomainError::NotFound { .. }))
        ));
        assert!(matches!(
            service.list_comments(post_id).await,
            Err(EngagementError::Domain(DomainError::NotFound { .. }))
        ));
    }
}
