use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use scribe::application::auth::{DEFAULT_TOKEN_TTL, TokenIssuer};
use scribe::application::repos::{CreatePostParams, PostsWriteRepo};
use scribe::cache::{CacheConfig, build_page_cache};
use scribe::infra::http::{AppState, REQUEST_ID_HEADER, build_router};
use scribe::infra::memory::InMemoryRepositories;

const SECRET: &str = "api-test-secret";

struct TestApp {
    router: Router,
    state: AppState,
    repos: Arc<InMemoryRepositories>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_max_page_size(100)
    }

    fn with_max_page_size(max_page_size: u32) -> Self {
        let repos = Arc::new(InMemoryRepositories::new());
        let cache = build_page_cache(&CacheConfig::default()).expect("memory cache");
        let state = AppState::from_repositories(
            repos.clone(),
            cache,
            TokenIssuer::new(SECRET, DEFAULT_TOKEN_TTL),
            max_page_size,
        );
        Self {
            router: build_router(state.clone()),
            state,
            repos,
        }
    }

    async fn seed_posts(&self, count: usize) {
        for n in 1..=count {
            self.repos
                .create_post(CreatePostParams {
                    title: format!("Seeded post {n}"),
                    body: format!("Seeded body {n}"),
                })
                .await
                .expect("seed post");
        }
    }

    async fn token(&self) -> String {
        self.state
            .auth
            .create_user("alice", "s3cret")
            .await
            .expect("create user");
        self.state
            .auth
            .authenticate("alice", "s3cret")
            .await
            .expect("authenticate")
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should collect")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method(Method::GET)
                .uri(uri)
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
    }

    async fn send_json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(
            builder
                .body(Body::from(body.to_string()))
                .expect("request should build"),
        )
        .await
    }

    async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(Method::DELETE).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).expect("request should build"))
            .await
    }
}

fn ids(body: &Value) -> Vec<i64> {
    body.as_array()
        .expect("array body")
        .iter()
        .map(|post| post["id"].as_i64().expect("numeric id"))
        .collect()
}

#[tokio::test]
async fn unknown_post_is_not_found() {
    let app = TestApp::new();
    let (status, body) = app.get("/posts/999999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn non_numeric_post_id_is_bad_request() {
    let app = TestApp::new();
    let (status, body) = app.get("/posts/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn listing_defaults_to_first_page_of_ten() {
    let app = TestApp::new();
    app.seed_posts(12).await;

    let (status, body) = app.get("/posts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), (1..=10).collect::<Vec<_>>());

    let (_, body) = app.get("/posts?page=2").await;
    assert_eq!(ids(&body), vec![11, 12]);

    let (status, body) = app.get("/posts?page=abc&pageSize=-5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body).len(), 10);

    let (_, body) = app.get("/posts?page=5&pageSize=10").await;
    assert!(ids(&body).is_empty());

    let (status, body) = app.get("/posts?page=2&page=3&pageSize=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), (1..=10).collect::<Vec<_>>());
}

#[tokio::test]
async fn page_size_is_capped() {
    let app = TestApp::with_max_page_size(5);
    app.seed_posts(8).await;

    let (_, body) = app.get("/posts?pageSize=50").await;
    assert_eq!(ids(&body), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn mutations_require_bearer_token() {
    let app = TestApp::new();
    app.seed_posts(1).await;
    let payload = json!({ "title": "A", "body": "B" });

    let (status, body) = app
        .send_json(Method::POST, "/posts", None, payload.clone())
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");

    let (status, _) = app
        .send_json(Method::POST, "/posts", Some("not-a-token"), payload)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.delete("/posts/1", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send_json(Method::POST, "/posts/1/likes", None, Value::Null)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn created_post_appears_in_next_listing() {
    let app = TestApp::new();
    let token = app.token().await;
    app.seed_posts(2).await;

    let (_, before) = app.get("/posts?page=1&pageSize=10").await;
    assert_eq!(ids(&before), vec![1, 2]);

    let (status, created) = app
        .send_json(
            Method::POST,
            "/posts",
            Some(&token),
            json!({ "title": "A", "body": "B" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["title"], "A");
    assert_eq!(created["body"], "B");

    let (_, after) = app.get("/posts?page=1&pageSize=10").await;
    assert_eq!(ids(&after), vec![1, 2, created["id"].as_i64().expect("id")]);

    let (_, all) = app.get("/posts/all").await;
    assert_eq!(ids(&all).len(), 3);
}

#[tokio::test]
async fn invalid_post_body_is_rejected() {
    let app = TestApp::new();
    let token = app.token().await;

    let (status, _) = app
        .send_json(Method::POST, "/posts", Some(&token), json!({ "title": "A" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send_json(
            Method::POST,
            "/posts",
            Some(&token),
            json!({ "title": "   ", "body": "B" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_input");
}

#[tokio::test]
async fn deleted_post_disappears_everywhere() {
    let app = TestApp::new();
    let token = app.token().await;
    app.seed_posts(3).await;

    let (_, cached) = app.get("/posts").await;
    assert_eq!(ids(&cached), vec![1, 2, 3]);
    let (_, cached_all) = app.get("/posts/all").await;
    assert_eq!(ids(&cached_all), vec![1, 2, 3]);

    let (status, body) = app.delete("/posts/2", Some(&token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = app.get("/posts/2").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, listed) = app.get("/posts").await;
    assert_eq!(ids(&listed), vec![1, 3]);
    let (_, all) = app.get("/posts/all").await;
    assert_eq!(ids(&all), vec![1, 3]);

    let (status, _) = app.delete("/posts/2", Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_requires_query_and_matches_title_or_body() {
    let app = TestApp::new();
    app.seed_posts(3).await;

    let (status, _) = app.get("/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get("/search?q=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.get("/search?q=post%202").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![2]);

    let (_, body) = app.get("/search?q=SEEDED%20BODY").await;
    assert_eq!(ids(&body), vec![1, 2, 3]);

    let (status, _) = app.get("/search?q=%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, body) = app.get("/search?q=%203").await;
    assert_eq!(ids(&body), vec![3]);
    let (_, body) = app.get("/search?q=3%20").await;
    assert!(ids(&body).is_empty());
}

#[tokio::test]
async fn authenticate_issues_usable_token() {
    let app = TestApp::new();
    app.state
        .auth
        .create_user("alice", "s3cret")
        .await
        .expect("create user");

    let (status, body) = app
        .send_json(
            Method::POST,
            "/authenticate",
            None,
            json!({ "username": "alice", "password": "wrong" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.get("token").is_none());

    let (status, body) = app
        .send_json(
            Method::POST,
            "/authenticate",
            None,
            json!({ "username": "alice", "password": "s3cret" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 86_400);
    let token = body["token"].as_str().expect("token string").to_string();

    let user = app.state.auth.verify_token(&token).expect("token verifies");
    assert_eq!(user.username, "alice");

    let (status, _) = app
        .send_json(
            Method::POST,
            "/posts",
            Some(&token),
            json!({ "title": "From token", "body": "works" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn comments_round_trip_through_api() {
    let app = TestApp::new();
    let token = app.token().await;
    app.seed_posts(1).await;

    let (status, created) = app
        .send_json(
            Method::POST,
            "/posts/1/comments",
            Some(&token),
            json!({ "body": "Nice post" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["post_id"], 1);

    let (status, padded) = app
        .send_json(
            Method::POST,
            "/posts/1/comments",
            Some(&token),
            json!({ "body": "  padded  " }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(padded["body"], "padded");

    let (status, listed) = app.get("/posts/1/comments").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().expect("array").len(), 2);
    assert_eq!(listed[0]["body"], "Nice post");
    assert_eq!(listed[1]["body"], "padded");

    let (status, _) = app
        .send_json(
            Method::POST,
            "/posts/42/comments",
            Some(&token),
            json!({ "body": "orphan" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn likes_count_each_user_once() {
    let app = TestApp::new();
    let token = app.token().await;
    app.seed_posts(1).await;

    for _ in 0..2 {
        let (status, body) = app
            .send_json(Method::POST, "/posts/1/likes", Some(&token), Value::Null)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "post_id": 1, "likes": 1 }));
    }

    let (status, body) = app.get("/posts/1/likes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["likes"], 1);

    let (status, _) = app.get("/posts/7/likes").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_store_and_cache() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("router should respond");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));

    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    let body: Value = serde_json::from_slice(&bytes).expect("json body");
    assert_eq!(
        body,
        json!({ "status": "ok", "store": "memory", "cache": "memory" })
    );
}
