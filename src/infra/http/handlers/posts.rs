//! Post listing, lookup, search and mutation.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use tracing::debug;

use crate::application::auth::AuthenticatedUser;
use crate::application::pagination::PageKey;
use crate::domain::entities::PostRecord;

use super::{json_body, post_id};
use crate::infra::http::error::ApiError;
use crate::infra::http::state::AppState;

/// Raw listing parameters. Unparsable values, and query strings that fail to deserialize at
/// all, fall back to defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub body: String,
}

pub async fn list_posts(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<PostRecord>>, ApiError> {
    let query = match query {
        Ok(Query(query)) => query,
        Err(err) => {
            debug!(
                target = "scribe::http::posts",
                error = %err.body_text(),
                "unreadable listing query; using defaults"
            );
            ListQuery::default()
        }
    };

    let key = PageKey::from_query(
        query.page.as_deref(),
        query.page_size.as_deref(),
        state.posts.max_page_size(),
    );
    debug!(target = "scribe::http::posts", page = %key, "listing posts");

    let posts = state.posts.list_page(key).await?;
    Ok(Json(posts))
}

pub async fn list_all_posts(
    State(state): State<AppState>,
) -> Result<Json<Vec<PostRecord>>, ApiError> {
    Ok(Json(state.posts.list_all().await?))
}

pub async fn get_post(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<PostRecord>, ApiError> {
    let id = post_id(path)?;
    Ok(Json(state.posts.get(id).await?))
}

pub async fn search_posts(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Vec<PostRecord>>, ApiError> {
    let q = query
        .ok()
        .and_then(|Query(query)| query.q)
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| {
            ApiError::bad_request(
                "Search query is required",
                Some("provide a non-empty `q` parameter".into()),
            )
        })?;

    Ok(Json(state.posts.search(&q).await?))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    body: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = json_body(body)?;
    let post = state.posts.create(&request.title, &request.body).await?;
    debug!(
        target = "scribe::http::posts",
        post_id = post.id,
        user_id = user.user_id,
        "post created via api"
    );
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = post_id(path)?;
    state.posts.delete(id).await?;
    debug!(
        target = "scribe::http::posts",
        post_id = id,
        user_id = user.user_id,
        "post deleted via api"
    );
    Ok(StatusCode::NO_CONTENT)
}
