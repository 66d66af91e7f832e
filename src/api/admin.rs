//! Admin console routes
//!
//! Everything here sits behind `require_auth`:
//! - GET /api/v1/admin/stats
//! - /api/v1/admin/posts, /categories, /tags
//! - session and profile routes from `auth`

use axum::{extract::State, routing::get, Json, Router};

use super::middleware::ApiError;
use super::{auth, categories, posts, tags, AppState};
use crate::models::DashboardStats;

/// Authenticated admin router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .nest("/posts", posts::router())
        .nest("/categories", categories::router())
        .nest("/tags", tags::router())
        .merge(auth::protected_router())
}

/// GET /api/v1/admin/stats
async fn stats(State(state): State<AppState>) -> Result<Json<DashboardStats>, ApiError> {
    Ok(Json(state.content.dashboard_stats().await?))
}
