//! GET /api/v1/health - liveness plus a database round trip

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::api::middleware::{ApiError, AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health))
}

async fn health(State(state): State<AppState>) -> Result<(StatusCode, Json<Value>), ApiError> {
    if let Err(e) = state.pool.ping().await {
        tracing::warn!("Health check failed: {}", e);
        return Err(ApiError::new("SERVICE_UNAVAILABLE", "Database unreachable"));
    }

    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "database": state.pool.driver(),
        })),
    ))
}
