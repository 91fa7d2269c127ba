//! Item API endpoints
//!
//! - POST /api/v1/items - Create an item
//! - PUT /api/v1/items/{id} - Update an item
//! - DELETE /api/v1/items/{id} - Delete an item, returning it

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{CreateItemInput, Item, UpdateItemInput};

/// Build the item router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_item))
        .route("/{id}", put(update_item).delete(delete_item))
}

/// POST /api/v1/items
async fn create_item(
    State(state): State<AppState>,
    Json(body): Json<CreateItemInput>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let item = state.mutations.create_item(body).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /api/v1/items/{id}
async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateItemInput>,
) -> Result<Json<Item>, ApiError> {
    let item = state.mutations.update_item(id, body).await?;
    Ok(Json(item))
}

/// DELETE /api/v1/items/{id}
async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Item>, ApiError> {
    let item = state.mutations.delete_item(id).await?;
    Ok(Json(item))
}
