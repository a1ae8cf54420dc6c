use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, Json};
use drivedeal_core::password::validate_password;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct PasswordCheckRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct PasswordCheckResponse {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub compromised: bool,
}

/// `POST /api/auth/password/check`
///
/// Policy violations and breach exposure are reported side by side. The breach lookup
/// fails open, so an unreachable service reports `compromised: false`.
pub async fn check_password(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<PasswordCheckRequest>,
) -> Result<Json<PasswordCheckResponse>, HttpAppError> {
    let validation = validate_password(&request.password);
    let compromised = state
        .breach_checker
        .is_password_compromised(&request.password)
        .await;

    Ok(Json(PasswordCheckResponse {
        is_valid: validation.is_valid,
        errors: validation.errors,
        compromised,
    }))
}
