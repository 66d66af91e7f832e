//! API layer - HTTP handlers and routing
//!
//! All endpoints live under `/api/v1`:
//! - `/blog/*`: public, published-only reads
//! - `/admin/login`: public
//! - every other `/admin/*` route requires a session

pub mod admin;
pub mod auth;
pub mod blog;
pub mod categories;
pub mod middleware;
pub mod posts;
pub mod tags;

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::AuthConfig;
use crate::db::Store;
use crate::services::{AuthService, BlogService, ContentService, MarkdownRenderer};

pub use middleware::{ApiError, AuthenticatedAdmin};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub content: Arc<ContentService>,
    pub blog: Arc<BlogService>,
    pub auth: Arc<AuthService>,
    pub markdown: MarkdownRenderer,
    /// Add `Secure` to the session cookie
    pub secure_cookie: bool,
}

impl AppState {
    pub fn new(store: Store, auth: &AuthConfig) -> Self {
        Self {
            content: Arc::new(ContentService::new(store.clone())),
            blog: Arc::new(BlogService::new(store.clone())),
            auth: Arc::new(AuthService::new(store, auth.session_ttl_hours)),
            markdown: MarkdownRenderer::new(),
            secure_cookie: auth.secure_cookie,
        }
    }
}

/// Build the `/api/v1` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .nest("/admin", admin::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    Router::new()
        .nest("/blog", blog::router())
        .nest("/admin", auth::public_router())
        .merge(protected_routes)
}

/// Build the complete router with CORS and request tracing
pub fn build_router(state: AppState, cors_origin: &str) -> anyhow::Result<Router> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", cors_origin))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    Ok(Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Shared setup for HTTP-level tests

    use super::*;
    use crate::db::{create_test_pool, migrations};
    use axum_test::TestServer;

    pub const ADMIN_USER: &str = "owner";
    pub const ADMIN_PASSWORD: &str = "hunter22";

    /// Server over a migrated in-memory store with one admin
    pub async fn server() -> TestServer {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        server_with_store(Store::new(pool)).await
    }

    pub async fn server_with_store(store: Store) -> TestServer {
        let state = AppState::new(store.clone(), &AuthConfig::default());
        if store.is_available() {
            state
                .auth
                .ensure_initial_admin(ADMIN_USER, ADMIN_PASSWORD)
                .await
                .expect("Failed to create admin");
        }
        let router = build_router(state, "http://localhost:3000").expect("router");
        TestServer::new(router).expect("Failed to start test server")
    }

    /// Log in and return the session token
    pub async fn login(server: &TestServer) -> String {
        let response = server
            .post("/api/v1/admin/login")
            .json(&serde_json::json!({ "username": ADMIN_USER, "password": ADMIN_PASSWORD }))
            .await;
        response.assert_status_ok();
        response.json::<serde_json::Value>()["token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }
}
