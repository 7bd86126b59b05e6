//! Process-local repositories used when no database is configured and in tests.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::application::repos::{
    CommentsRepo, CreatePostParams, CreateUserParams, LikesRepo, PostsRepo, PostsWriteRepo,
    RepoError, UsersRepo,
};
use crate::domain::entities::{CommentRecord, PostRecord, UserRecord};

const USERNAME_CONSTRAINT: &str = "users_username_key";

#[derive(Default)]
struct State {
    posts: BTreeMap<i64, PostRecord>,
    users: BTreeMap<i64, UserRecord>,
    comments: BTreeMap<i64, CommentRecord>,
    likes: HashSet<(i64, i64)>,
    next_post_id: i64,
    next_user_id: i64,
    next_comment_id: i64,
}

impl State {
    fn live_posts(&self) -> impl Iterator<Item = &PostRecord> {
        self.posts.values().filter(|post| post.deleted_at.is_none())
    }
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

/// Every repository trait over one shared map. Ids are assigned in ascending order.
#[derive(Default)]
pub struct InMemoryRepositories {
    state: RwLock<State>,
}

impl InMemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostsRepo for InMemoryRepositories {
    async fn list_page(&self, offset: u64, limit: u32) -> Result<Vec<PostRecord>, RepoError> {
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let state = self.state.read().await;
        Ok(state
            .live_posts()
            .skip(offset)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<PostRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.live_posts().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .posts
            .get(&id)
            .filter(|post| post.deleted_at.is_none())
            .cloned())
    }

    async fn search(&self, query: &str) -> Result<Vec<PostRecord>, RepoError> {
        let needle = query.to_lowercase();
        let state = self.state.read().await;
        Ok(state
            .live_posts()
            .filter(|post| {
                post.title.to_lowercase().contains(&needle)
                    || post.body.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PostsWriteRepo for InMemoryRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.write().await;
        let now = OffsetDateTime::now_utc();
        let post = PostRecord {
            id: next_id(&mut state.next_post_id),
            title: params.title,
            body: params.body,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        state.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn soft_delete_post(&self, id: i64) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        match state.posts.get_mut(&id) {
            Some(post) if post.deleted_at.is_none() => {
                let now = OffsetDateTime::now_utc();
                post.deleted_at = Some(now);
                post.updated_at = now;
                Ok(())
            }
            _ => Err(RepoError::NotFound),
        }
    }
}

#[async_trait]
impl UsersRepo for InMemoryRepositories {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|user| user.username == params.username)
        {
            return Err(RepoError::Duplicate {
                constraint: USERNAME_CONSTRAINT.to_string(),
            });
        }

        let user = UserRecord {
            id: next_id(&mut state.next_user_id),
            username: params.username,
            password_hash: params.password_hash,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl CommentsRepo for InMemoryRepositories {
    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn create_comment(
        &self,
        post_id: i64,
        body: String,
    ) -> Result<CommentRecord, RepoError> {
        let mut state = self.state.write().await;
        if !state.posts.contains_key(&post_id) {
            return Err(RepoError::InvalidInput {
                message: format!("post {post_id} does not exist"),
            });
        }

        let comment = CommentRecord {
            id: next_id(&mut state.next_comment_id),
            post_id,
            body,
            created_at: OffsetDateTime::now_utc(),
        };
        state.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }
}

#[async_trait]
impl LikesRepo for InMemoryRepositories {
    async fn count_likes(&self, post_id: i64) -> Result<u64, RepoError> {
        let state = self.state.read().await;
        Ok(state.likes.iter().filter(|(post, _)| *post == post_id).count() as u64)
    }

    async fn add_like(&self, post_id: i64, user_id: i64) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        Ok(state.likes.insert((post_id, user_id)))
    }
}
