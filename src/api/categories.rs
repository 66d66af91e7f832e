//! Category admin endpoints
//!
//! - GET|POST /api/v1/admin/categories
//! - GET|PUT|DELETE /api/v1/admin/categories/{id}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use super::auth::SuccessResponse;
use super::middleware::ApiError;
use super::AppState;
use crate::models::{Category, CreateCategoryInput, UpdateCategoryInput};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
}

async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.content.list_categories().await?))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Category>, ApiError> {
    state
        .content
        .get_category(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Category {} not found", id)))
}

async fn create_category(
    State(state): State<AppState>,
    Json(body): Json<CreateCategoryInput>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state.content.create_category(body).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateCategoryInput>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.content.update_category(id, body).await?))
}

async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.content.delete_category(id).await?;
    Ok(Json(SuccessResponse { success: true }))
}
