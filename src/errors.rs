use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors raised by the service layer. `NoMapping` is deliberately absent:
/// an item whose SKU has no product row surfaces as a partial-fulfillment
/// remainder on its allocation, not as an error.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("policy error: {0}")]
    PolicyError(String),

    #[error("capacity exhausted: {0}")]
    CapacityExhausted(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    pub fn db_error(e: DbErr) -> Self {
        ServiceError::DatabaseError(e)
    }
}

/// HTTP-boundary error. Services never construct this directly; handlers
/// convert via `From<ServiceError>`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unprocessable Entity: {0}")]
    UnprocessableEntity(String),

    #[error("Internal Server Error")]
    InternalServerError,
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(msg) => ApiError::NotFound(msg),
            ServiceError::Forbidden(msg) => ApiError::Forbidden(msg),
            ServiceError::Conflict(msg) => ApiError::Conflict(msg),
            ServiceError::ValidationError(msg) => ApiError::BadRequest(msg),
            ServiceError::PolicyError(msg) | ServiceError::CapacityExhausted(msg) => {
                ApiError::UnprocessableEntity(msg)
            }
            ServiceError::DatabaseError(e) => {
                error!(error = %e, "database error reached the HTTP boundary");
                ApiError::InternalServerError
            }
            ServiceError::InternalError(msg) => {
                error!(error = %msg, "internal error reached the HTTP boundary");
                ApiError::InternalServerError
            }
        }
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_expected_status_codes() {
        let cases: Vec<(ServiceError, StatusCode)> = vec![
            (
                ServiceError::NotFound("route 9".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                ServiceError::Forbidden("not your route".into()),
                StatusCode::FORBIDDEN,
            ),
            (
                ServiceError::PolicyError("no business day".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ServiceError::CapacityExhausted("buyer 3".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ServiceError::Conflict("plan already running".into()),
                StatusCode::CONFLICT,
            ),
            (
                ServiceError::ValidationError("quantity".into()),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (service_err, expected) in cases {
            let api_err: ApiError = service_err.into();
            assert_eq!(api_err.status_code(), expected);
        }
    }
}
