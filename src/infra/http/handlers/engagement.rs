//! Comments and likes on a post.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::application::auth::AuthenticatedUser;
use crate::application::engagement::LikeSummary;
use crate::domain::entities::CommentRecord;

use super::{json_body, post_id};
use crate::infra::http::error::ApiError;
use crate::infra::http::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub body: String,
}

pub async fn list_comments(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<CommentRecord>>, ApiError> {
    let id = post_id(path)?;
    Ok(Json(state.engagement.list_comments(id).await?))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthenticatedUser>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = post_id(path)?;
    let request = json_body(body)?;
    let comment = state.engagement.add_comment(id, &request.body).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn count_likes(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<LikeSummary>, ApiError> {
    let id = post_id(path)?;
    Ok(Json(state.engagement.count_likes(id).await?))
}

pub async fn like_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<LikeSummary>, ApiError> {
    let id = post_id(path)?;
    Ok(Json(state.engagement.add_like(id, user.user_id).await?))
}
