use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use sea_orm::TransactionTrait;
use serde_json::json;

use crate::{
    auth::AuthenticatedStaff,
    errors::{ApiError, ServiceError},
    handlers::common::ok_response,
    services::distance_matrix,
    AppState,
};

/// POST /distance-matrix/recompute — rebuild the pairwise store cache.
async fn recompute(
    State(state): State<Arc<AppState>>,
    _staff: AuthenticatedStaff,
) -> Result<impl IntoResponse, ApiError> {
    let txn = state
        .db
        .begin()
        .await
        .map_err(|e| ApiError::from(ServiceError::from(e)))?;
    let pairs = distance_matrix::rebuild(&txn).await?;
    txn.commit()
        .await
        .map_err(|e| ApiError::from(ServiceError::from(e)))?;

    Ok(ok_response(json!({
        "message": format!("{pairs}件の店舗間距離を計算しました"),
        "pairs_calculated": pairs,
    })))
}

/// GET /distance-matrix/nearest/{store_id}
async fn nearest(
    State(state): State<Arc<AppState>>,
    _staff: AuthenticatedStaff,
    Path(store_id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let neighbors = distance_matrix::nearest_stores(&*state.db, store_id, 10).await?;
    Ok(ok_response(json!({
        "store_id": store_id,
        "nearest": neighbors
            .into_iter()
            .map(|(store_id, distance_km, travel_time_minutes)| json!({
                "store_id": store_id,
                "distance_km": distance_km,
                "travel_time_minutes": travel_time_minutes,
            }))
            .collect::<Vec<_>>(),
    })))
}

pub fn distance_matrix_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/recompute", post(recompute))
        .route("/nearest/:store_id", get(nearest))
}
