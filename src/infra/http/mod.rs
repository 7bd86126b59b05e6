//! HTTP surface: router, middleware and handlers.

mod error;
pub mod handlers;
mod middleware;
mod state;

pub use error::{ApiError, ApiErrorBody, ApiErrorMessage, codes};
pub use middleware::{REQUEST_ID_HEADER, RequestContext};
pub use state::AppState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

/// Builds the public router. Mutating routes sit behind bearer authentication.
pub fn build_router(state: AppState) -> Router {
    let auth = axum_middleware::from_fn_with_state(state.clone(), middleware::require_auth);

    Router::new()
        .route(
            "/posts",
            get(handlers::posts::list_posts)
                .merge(post(handlers::posts::create_post).route_layer(auth.clone())),
        )
        .route("/posts/all", get(handlers::posts::list_all_posts))
        .route(
            "/posts/{id}",
            get(handlers::posts::get_post).merge(
                axum::routing::delete(handlers::posts::delete_post).route_layer(auth.clone()),
            ),
        )
        .route(
            "/posts/{id}/comments",
            get(handlers::engagement::list_comments)
                .merge(post(handlers::engagement::create_comment).route_layer(auth.clone())),
        )
        .route(
            "/posts/{id}/likes",
            get(handlers::engagement::count_likes)
                .merge(post(handlers::engagement::like_post).route_layer(auth)),
        )
        .route("/search", get(handlers::posts::search_posts))
        .route("/authenticate", post(handlers::auth::authenticate))
        .route("/health", get(handlers::health::health))
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}
