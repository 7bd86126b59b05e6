//! Post reads and writes, with listings served through the page cache.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::application::pagination::PageKey;
use crate::application::repos::{CreatePostParams, PostsRepo, PostsWriteRepo, RepoError};
use crate::cache::{CacheKey, DEFAULT_MAX_PAGE_SIZE, PageCache};
use crate::domain::entities::PostRecord;
use crate::domain::error::DomainError;
use crate::domain::posts::PostDraft;

#[derive(Debug, Error)]
pub enum PostServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct PostService {
    reader: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    cache: Option<Arc<PageCache>>,
    max_page_size: u32,
}

impl PostService {
    pub fn new(reader: Arc<dyn PostsRepo>, writer: Arc<dyn PostsWriteRepo>) -> Self {
        Self {
            reader,
            writer,
            cache: None,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    pub fn with_cache(self, cache: Arc<PageCache>) -> Self {
        self.with_cache_opt(Some(cache))
    }

    pub fn with_cache_opt(mut self, cache: Option<Arc<PageCache>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_max_page_size(mut self, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size.max(1);
        self
    }

    pub fn max_page_size(&self) -> u32 {
        self.max_page_size
    }

    pub async fn list_page(&self, key: PageKey) -> Result<Vec<PostRecord>, PostServiceError> {
        let reader = self.reader.clone();
        let load = move |_: CacheKey| async move {
            reader.list_page(key.offset(), key.limit()).await
        };

        let posts = match &self.cache {
            Some(cache) => cache.get_or_populate(key.into(), cache.ttl(), load).await?,
            None => load(key.into()).await?,
        };
        Ok(posts)
    }

    pub async fn list_all(&self) -> Result<Vec<PostRecord>, PostServiceError> {
        let reader = self.reader.clone();
        let load = move |_: CacheKey| async move { reader.list_all().await };

        let posts = match &self.cache {
            Some(cache) => {
                cache
                    .get_or_populate(CacheKey::AllPosts, cache.ttl(), load)
                    .await?
            }
            None => load(CacheKey::AllPosts).await?,
        };
        Ok(posts)
    }

    pub async fn get(&self, id: i64) -> Result<PostRecord, PostServiceError> {
        self.reader
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("post").into())
    }

    /// Substring search over title and body, matching `query` as given. Results are never
    /// cached.
    pub async fn search(&self, query: &str) -> Result<Vec<PostRecord>, PostServiceError> {
        if query.trim().is_empty() {
            return Err(DomainError::validation("search query must not be empty").into());
        }
        Ok(self.reader.search(query).await?)
    }

    pub async fn create(&self, title: &str, body: &str) -> Result<PostRecord, PostServiceError> {
        let (title, body) = PostDraft::new(title, body)?.into_parts();
        let post = self
            .writer
            .create_post(CreatePostParams { title, body })
            .await?;

        info!(target = "scribe::posts", post_id = post.id, "post created");
        self.invalidate_listings("post.create").await;
        Ok(post)
    }

    pub async fn delete(&self, id: i64) -> Result<(), PostServiceError> {
        match self.writer.soft_delete_post(id).await {
            Ok(()) => {}
            Err(RepoError::NotFound) => return Err(DomainError::not_found("post").into()),
            Err(err) => return Err(err.into()),
        }

        info!(target = "scribe::posts", post_id = id, "post deleted");
        self.invalidate_listings("post.delete").await;
        Ok(())
    }

    /// Drops every cached listing. Failure leaves staleness bounded by the TTL.
    async fn invalidate_listings(&self, reason: &'static str) {
        let Some(cache) = &self.cache else {
            return;
        };

        if let Err(err) = cache.invalidate_all().await {
            warn!(
                target = "scribe::posts",
                reason,
                error = %err,
                "Failed to invalidate cached listings; entries expire with their TTL"
            );
        }
    }
}
