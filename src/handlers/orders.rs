use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::AuthenticatedStaff,
    errors::ApiError,
    handlers::common::{created_response, ok_response, validate_input},
    services::orders::{CreateOrderRequest, OrderListFilter},
    AppState,
};

/// POST /orders — single-order intake (cutoff + bundle expansion applied).
async fn create_order(
    State(state): State<Arc<AppState>>,
    _staff: AuthenticatedStaff,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&request)?;
    let response = state.services.orders.create_order(request).await?;
    Ok(created_response(response))
}

#[derive(Debug, Deserialize)]
struct BulkOrderImport {
    orders: Vec<CreateOrderRequest>,
}

/// POST /orders/import — bulk intake.
async fn import_orders(
    State(state): State<Arc<AppState>>,
    _staff: AuthenticatedStaff,
    Json(payload): Json<BulkOrderImport>,
) -> Result<impl IntoResponse, ApiError> {
    for request in &payload.orders {
        validate_input(request)?;
    }
    let order_ids = state.services.orders.import_orders(payload.orders).await?;
    Ok(created_response(json!({
        "message": format!("{}件の注文をインポートしました", order_ids.len()),
        "count": order_ids.len(),
        "order_ids": order_ids,
    })))
}

/// GET /orders?status=&target_date=&search=
async fn list_orders(
    State(state): State<Arc<AppState>>,
    _staff: AuthenticatedStaff,
    Query(filter): Query<OrderListFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state.services.orders.list_orders(filter).await?;
    Ok(ok_response(orders))
}

#[derive(Debug, Deserialize)]
struct StatsQuery {
    target_date: Option<NaiveDate>,
}

/// GET /orders/stats
async fn order_stats(
    State(state): State<Arc<AppState>>,
    _staff: AuthenticatedStaff,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.services.orders.order_stats(query.target_date).await?;
    Ok(ok_response(stats))
}

/// GET /orders/{order_id}
async fn get_order(
    State(state): State<Arc<AppState>>,
    _staff: AuthenticatedStaff,
    Path(order_id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state.services.orders.get_order(order_id).await?;
    Ok(ok_response(order))
}

/// DELETE /orders/{order_id} — refused once execution has begun.
async fn delete_order(
    State(state): State<Arc<AppState>>,
    _staff: AuthenticatedStaff,
    Path(order_id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.orders.delete_order(order_id).await?;
    Ok(ok_response(json!({ "message": "注文を削除しました" })))
}

pub fn orders_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/import", post(import_orders))
        .route("/stats", get(order_stats))
        .route("/:order_id", get(get_order).delete(delete_order))
}
