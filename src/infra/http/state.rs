use std::sync::Arc;

use crate::application::auth::{AuthService, TokenIssuer};
use crate::application::engagement::EngagementService;
use crate::application::posts::PostService;
use crate::application::repos::{CommentsRepo, LikesRepo, PostsRepo, PostsWriteRepo, UsersRepo};
use crate::cache::PageCache;
use crate::infra::db::PostgresRepositories;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<PostService>,
    pub auth: Arc<AuthService>,
    pub engagement: Arc<EngagementService>,
    /// Present when posts live in PostgreSQL; pinged by `/health`.
    pub db: Option<Arc<PostgresRepositories>>,
    pub cache_backend: Option<&'static str>,
}

impl AppState {
    /// Wires every service over one repository implementation.
    pub fn from_repositories<R>(
        repos: Arc<R>,
        cache: Option<Arc<PageCache>>,
        tokens: TokenIssuer,
        max_page_size: u32,
    ) -> Self
    where
        R: PostsRepo + PostsWriteRepo + UsersRepo + CommentsRepo + LikesRepo + 'static,
    {
        let cache_backend = cache.as_ref().map(|cache| cache.backend_kind());
        let posts = PostService::new(repos.clone(), repos.clone())
            .with_cache_opt(cache)
            .with_max_page_size(max_page_size);
        let auth = AuthService::new(repos.clone(), tokens);
        let engagement = EngagementService::new(repos.clone(), repos.clone(), repos);

        Self {
            posts: Arc::new(posts),
            auth: Arc::new(auth),
            engagement: Arc::new(engagement),
            db: None,
            cache_backend,
        }
    }

    pub fn with_database(mut self, db: Arc<PostgresRepositories>) -> Self {
        self.db = Some(db);
        self
    }
}
