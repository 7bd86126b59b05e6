//! Request handlers grouped by resource.

pub mod auth;
pub mod engagement;
pub mod health;
pub mod posts;

use axum::Json;
use axum::extract::Path;
use axum::extract::rejection::{JsonRejection, PathRejection};

use super::error::ApiError;

pub(crate) fn post_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    path.map(|Path(id)| id).map_err(|err| {
        ApiError::bad_request("Invalid post id", Some("post id must be an integer".into()))
            .with_detail(err.body_text())
    })
}

pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|err| ApiError::bad_request("Invalid request body", Some(err.body_text())))
}
