//! Tag admin endpoints
//!
//! - GET|POST /api/v1/admin/tags
//! - GET|PUT|DELETE /api/v1/admin/tags/{id}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use super::auth::SuccessResponse;
use super::middleware::ApiError;
use super::AppState;
use crate::models::{CreateTagInput, Tag, UpdateTagInput};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tags).post(create_tag))
        .route("/{id}", get(get_tag).put(update_tag).delete(delete_tag))
}

async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.content.list_tags().await?))
}

async fn get_tag(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Tag>, ApiError> {
    state
        .content
        .get_tag(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Tag {} not found", id)))
}

async fn create_tag(
    State(state): State<AppState>,
    Json(body): Json<CreateTagInput>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    let tag = state.content.create_tag(body).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

async fn update_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateTagInput>,
) -> Result<Json<Tag>, ApiError> {
    Ok(Json(state.content.update_tag(id, body).await?))
}

async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.content.delete_tag(id).await?;
    Ok(Json(SuccessResponse { success: true }))
}
