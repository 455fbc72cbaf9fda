use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::dtos::ErrorResponse;

/// JSON extractor that also runs the DTO's validator rules, rejecting with a
/// 400 that names the offending fields.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            reject(format!("Invalid request body: {}", e.body_text()))
        })?;

        value.validate().map_err(|e| {
            let mut fields: Vec<&str> = e.field_errors().into_keys().collect();
            fields.sort_unstable();
            reject(format!("Invalid fields: {}", fields.join(", ")))
        })?;

        Ok(ValidatedJson(value))
    }
}

fn reject(error: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error })).into_response()
}
