use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use validator::Validate;

use crate::errors::ApiError;

/// Validate a request DTO, mapping failures to a 400 with details.
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ApiError> {
    input
        .validate()
        .map_err(|e| ApiError::BadRequest(format!("validation failed: {e}")))
}

pub fn ok_response<T: Serialize>(body: T) -> impl IntoResponse {
    (StatusCode::OK, Json(body))
}

pub fn created_response<T: Serialize>(body: T) -> impl IntoResponse {
    (StatusCode::CREATED, Json(body))
}
