use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
};

use crate::dtos::TokenQuery;
use crate::handlers::pages;
use crate::services::{ApprovalOutcome, ServiceError};
use crate::AppState;

/// Approve a pending registration.
///
/// GET /approve?token=...
#[tracing::instrument(skip_all)]
pub async fn approve(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> (StatusCode, Html<String>) {
    let Some(token) = query.token else {
        return (StatusCode::BAD_REQUEST, Html(pages::missing_token()));
    };

    match state.approval.approve(&token).await {
        Ok(ApprovalOutcome::Created { payload }) => {
            (StatusCode::OK, Html(pages::approved(&payload)))
        }
        Ok(ApprovalOutcome::AlreadyExists { payload }) => {
            (StatusCode::OK, Html(pages::already_exists(&payload)))
        }
        Err(ServiceError::Token(e)) => {
            tracing::warn!(error = %e, "Approval token rejected");
            (StatusCode::BAD_REQUEST, Html(pages::invalid_link()))
        }
        Err(e) => {
            tracing::error!(error = %e, "Approval failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(pages::directory_failure(&e.to_string())),
            )
        }
    }
}

/// Deny a pending registration.
///
/// GET /deny?token=...
#[tracing::instrument(skip_all)]
pub async fn deny(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> (StatusCode, Html<String>) {
    let Some(token) = query.token else {
        return (StatusCode::BAD_REQUEST, Html(pages::missing_token()));
    };

    match state.approval.deny(&token).await {
        Ok(payload) => (StatusCode::OK, Html(pages::denied(&payload))),
        Err(ServiceError::Token(e)) => {
            tracing::warn!(error = %e, "Denial token rejected");
            (StatusCode::BAD_REQUEST, Html(pages::invalid_link()))
        }
        Err(e) => {
            tracing::error!(error = %e, "Denial failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(pages::directory_failure(&e.to_string())),
            )
        }
    }
}
