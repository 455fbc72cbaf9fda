use axum::{extract::State, Json};

use crate::AppState;

/// Service health check. There are no backing stores to probe; liveness is
/// the whole story.
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
    }))
}
