use async_trait::async_trait;
use sqlx::{query, query_as, query_scalar};
use time::OffsetDateTime;

use crate::application::repos::{CommentsRepo, LikesRepo, RepoError};
use crate::domain::entities::CommentRecord;

use super::PostgresRepositories;
use super::util::{convert_count, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    post_id: i64,
    body: String,
    created_at: OffsetDateTime,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            body: row.body,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentRecord>, RepoError> {
        let rows = query_as::<_, CommentRow>(
            "SELECT id, post_id, body, created_at FROM comments \
             WHERE post_id = $1 ORDER BY id ASC",
        )
        .bind(post_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }

    async fn create_comment(
        &self,
        post_id: i64,
        body: String,
    ) -> Result<CommentRecord, RepoError> {
        let row = query_as::<_, CommentRow>(
            "INSERT INTO comments (post_id, body) VALUES ($1, $2) \
             RETURNING id, post_id, body, created_at",
        )
        .bind(post_id)
        .bind(body)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.into())
    }
}

#[async_trait]
impl LikesRepo for PostgresRepositories {
    async fn count_likes(&self, post_id: i64) -> Result<u64, RepoError> {
        let count: i64 = query_scalar("SELECT COUNT(*) FROM likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        convert_count(count)
    }

    async fn add_like(&self, post_id: i64, user_id: i64) -> Result<bool, RepoError> {
        let result = query(
            "INSERT INTO likes (post_id, user_id) VALUES ($1, $2) \
             ON CONFLICT (post_id, user_id) DO NOTHING",
        )
        .bind(post_id)
        .bind(user_id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}
