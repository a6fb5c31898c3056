use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, routing::post, Json, Router};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use validator::Validate;

use crate::{
    entities::staff::{self, Entity as StaffEntity},
    errors::{ApiError, ServiceError},
    handlers::common::{ok_response, validate_input},
    AppState,
};

#[derive(Debug, Deserialize, Validate)]
struct LoginRequest {
    #[validate(email(message = "valid email required"))]
    email: String,
    #[validate(length(min = 1, message = "password required"))]
    password: String,
}

/// POST /auth/login — issue a JWT for an active staff member.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&request)?;

    let staff_row = StaffEntity::find()
        .filter(staff::Column::Email.eq(request.email.clone()))
        .filter(staff::Column::IsActive.eq(true))
        .one(&*state.db)
        .await
        .map_err(|e| ApiError::from(ServiceError::from(e)))?
        .ok_or(ApiError::Unauthorized)?;

    if !state
        .auth
        .verify_password(&request.password, &staff_row.password_hash)
    {
        return Err(ApiError::Unauthorized);
    }

    let token = state.auth.issue_token(staff_row.staff_id, staff_row.role)?;
    info!(staff_id = staff_row.staff_id, "staff logged in");

    Ok(ok_response(json!({
        "token": token,
        "staff_id": staff_row.staff_id,
        "staff_name": staff_row.staff_name,
        "role": staff_row.role,
    })))
}

pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new().route("/login", post(login))
}
