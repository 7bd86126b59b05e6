use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};

use super::json_body;
use crate::infra::http::error::ApiError;
use crate::infra::http::state::AppState;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

pub async fn authenticate(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let credentials = json_body(body)?;
    let token = state
        .auth
        .authenticate(&credentials.username, &credentials.password)
        .await?;

    Ok(Json(TokenResponse {
        token,
        token_type: "Bearer",
        expires_in: state.auth.token_ttl().as_secs(),
    }))
}
