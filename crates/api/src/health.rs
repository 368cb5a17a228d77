use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::AppState;

/// Basic liveness check
/// GET /api/health
pub async fn liveness() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// Readiness check - verifies the database connection
/// GET /api/health/ready
pub async fn readiness(State(state): State<Arc<AppState>>) -> Result<Json<Value>, StatusCode> {
    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => Ok(Json(json!({ "status": "ready" }))),
        Err(e) => {
            tracing::error!("Database health check failed: {:?}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
