use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::infra::http::error::{ApiError, codes};
use crate::infra::http::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub store: &'static str,
    pub cache: &'static str,
}

pub async fn health(State(state): State<AppState>) -> Response {
    let store = match &state.db {
        Some(db) => {
            if let Err(err) = db.health_check().await {
                return ApiError::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    codes::UNAVAILABLE,
                    "Store unavailable",
                    None,
                )
                .with_detail(err.to_string())
                .into_response();
            }
            "postgres"
        }
        None => "memory",
    };

    Json(HealthReport {
        status: "ok",
        store,
        cache: state.cache_backend.unwrap_or("disabled"),
    })
    .into_response()
}
