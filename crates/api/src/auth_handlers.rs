use axum::{extract::State, response::Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use smiletrip_auth::issue_admin_token;
use smiletrip_core::ApiError;

use crate::AppState;

#[derive(Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Exchange admin credentials for a signed session token
/// POST /api/auth/login
///
/// Wrong password, unknown email and unconfigured admin all produce the
/// same 401; the caller learns nothing about which it was.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(input): Json<LoginInput>,
) -> Result<Json<Value>, ApiError> {
    if !state.auth.credentials_match(&input.email, &input.password) {
        tracing::warn!("failed admin login attempt for {}", input.email);
        return Err(ApiError::Unauthorized);
    }

    let token = issue_admin_token(&state.auth.jwt_secret).map_err(|e| {
        tracing::error!("failed to sign admin token: {:?}", e);
        ApiError::Internal
    })?;

    Ok(Json(json!({ "token": token })))
}
