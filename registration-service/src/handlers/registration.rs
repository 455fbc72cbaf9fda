use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::dtos::{RegisterRequest, RegisterResponse};
use crate::{utils::ValidatedJson, AppState};
use service_core::error::AppError;

/// Register a new user.
///
/// POST /register
#[tracing::instrument(skip(state, req))]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let receipt = state
        .registration
        .register(req)
        .await
        .map_err(AppError::from)?;

    Ok((
        StatusCode::OK,
        Json(RegisterResponse {
            message: "Registration submitted successfully".to_string(),
            status: receipt.status.to_string(),
        }),
    ))
}
