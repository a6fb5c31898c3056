use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::AuthenticatedStaff,
    common::jst_now,
    entities::{
        route::{self, Entity as RouteEntity, RouteStatus},
        route_stop::{self, Entity as RouteStopEntity, StopStatus},
        store::{self, Entity as StoreEntity},
    },
    errors::{ApiError, ServiceError},
    handlers::common::ok_response,
    services::execution::{self, StopUpdate},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct RouteListQuery {
    pub date: Option<NaiveDate>,
    pub staff_id: Option<i32>,
    pub status: Option<RouteStatus>,
}

fn stop_json(stop: &route_stop::Model, stores: &HashMap<i32, store::Model>) -> serde_json::Value {
    let store_row = stores.get(&stop.store_id);
    json!({
        "stop_id": stop.stop_id,
        "store_id": stop.store_id,
        "store_name": store_row.map(|s| s.store_name.clone()),
        "store_address": store_row.and_then(|s| s.address.clone()),
        "stop_sequence": stop.stop_sequence,
        "stop_status": stop.status,
        "items_count": stop.items_count,
        "items_to_purchase": stop.items_to_purchase,
        "estimated_arrival": stop.estimated_arrival,
        "actual_arrival": stop.actual_arrival,
        "actual_departure": stop.actual_departure,
    })
}

async fn stores_for(
    state: &AppState,
    stops: &[route_stop::Model],
) -> Result<HashMap<i32, store::Model>, ApiError> {
    let store_ids: Vec<i32> = stops.iter().map(|s| s.store_id).collect();
    if store_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = StoreEntity::find()
        .filter(store::Column::StoreId.is_in(store_ids))
        .all(&*state.db)
        .await
        .map_err(|e| ApiError::from(ServiceError::from(e)))?;
    Ok(rows.into_iter().map(|s| (s.store_id, s)).collect())
}

/// GET /routes?date=&staff_id=&status=
async fn list_routes(
    State(state): State<Arc<AppState>>,
    _staff: AuthenticatedStaff,
    Query(query): Query<RouteListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut find = RouteEntity::find();
    if let Some(date) = query.date {
        find = find.filter(route::Column::RouteDate.eq(date));
    }
    if let Some(staff_id) = query.staff_id {
        find = find.filter(route::Column::StaffId.eq(staff_id));
    }
    if let Some(status) = query.status {
        find = find.filter(route::Column::Status.eq(status));
    }

    let routes = find
        .order_by_desc(route::Column::RouteDate)
        .all(&*state.db)
        .await
        .map_err(|e| ApiError::from(ServiceError::from(e)))?;

    let mut payload = Vec::with_capacity(routes.len());
    for route_row in routes {
        let stops = RouteStopEntity::find()
            .filter(route_stop::Column::RouteId.eq(route_row.route_id))
            .order_by_asc(route_stop::Column::StopSequence)
            .all(&*state.db)
            .await
            .map_err(|e| ApiError::from(ServiceError::from(e)))?;
        let stores = stores_for(&state, &stops).await?;
        let completed = stops
            .iter()
            .filter(|s| s.status == StopStatus::Completed)
            .count();

        payload.push(json!({
            "route_id": route_row.route_id,
            "staff_id": route_row.staff_id,
            "route_date": route_row.route_date,
            "route_status": route_row.status,
            "total_distance_km": route_row.total_distance_km,
            "estimated_time_minutes": route_row.estimated_time_minutes,
            "total_stops": stops.len(),
            "completed_stops": completed,
            "stops": stops.iter().map(|s| stop_json(s, &stores)).collect::<Vec<_>>(),
        }));
    }

    Ok(ok_response(payload))
}

/// GET /routes/{route_id}
async fn get_route(
    State(state): State<Arc<AppState>>,
    _staff: AuthenticatedStaff,
    Path(route_id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let route_row = RouteEntity::find_by_id(route_id)
        .one(&*state.db)
        .await
        .map_err(|e| ApiError::from(ServiceError::from(e)))?
        .ok_or_else(|| ApiError::NotFound("ルートが見つかりません".to_string()))?;

    let stops = RouteStopEntity::find()
        .filter(route_stop::Column::RouteId.eq(route_id))
        .order_by_asc(route_stop::Column::StopSequence)
        .all(&*state.db)
        .await
        .map_err(|e| ApiError::from(ServiceError::from(e)))?;
    let stores = stores_for(&state, &stops).await?;

    Ok(ok_response(json!({
        "route_id": route_row.route_id,
        "staff_id": route_row.staff_id,
        "list_id": route_row.list_id,
        "route_date": route_row.route_date,
        "route_status": route_row.status,
        "total_distance_km": route_row.total_distance_km,
        "estimated_time_minutes": route_row.estimated_time_minutes,
        "include_return": route_row.include_return,
        "stops": stops.iter().map(|s| stop_json(s, &stores)).collect::<Vec<_>>(),
    })))
}

#[derive(Debug, Deserialize)]
struct RouteStatusUpdate {
    status: RouteStatus,
}

/// PATCH /routes/{route_id}/status
async fn update_route_status(
    State(state): State<Arc<AppState>>,
    staff: AuthenticatedStaff,
    Path(route_id): Path<i32>,
    Json(update): Json<RouteStatusUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let route_row = RouteEntity::find_by_id(route_id)
        .one(&*state.db)
        .await
        .map_err(|e| ApiError::from(ServiceError::from(e)))?
        .ok_or_else(|| ApiError::NotFound("ルートが見つかりません".to_string()))?;

    if !crate::auth::can_update_stop(&staff, route_row.staff_id) {
        return Err(ApiError::Forbidden(
            "このルートを更新する権限がありません".to_string(),
        ));
    }

    let mut active: route::ActiveModel = route_row.into();
    active.status = Set(update.status);
    active.updated_at = Set(Some(jst_now()));
    active
        .update(&*state.db)
        .await
        .map_err(|e| ApiError::from(ServiceError::from(e)))?;

    Ok(ok_response(json!({
        "message": "ステータスを更新しました",
        "new_status": update.status,
    })))
}

/// PATCH /routes/{route_id}/stops/{stop_id} — the execution tracker entry.
async fn update_stop(
    State(state): State<Arc<AppState>>,
    staff: AuthenticatedStaff,
    Path((route_id, stop_id)): Path<(i32, i32)>,
    Json(update): Json<StopUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let txn = state
        .db
        .begin()
        .await
        .map_err(|e| ApiError::from(ServiceError::from(e)))?;
    let result = execution::update_stop_status(&txn, &staff, route_id, stop_id, update).await?;
    txn.commit()
        .await
        .map_err(|e| ApiError::from(ServiceError::from(e)))?;

    state
        .events
        .send(crate::events::Event::StopStatusChanged {
            route_id,
            stop_id,
            new_status: result.new_status.to_string(),
        })
        .await;

    Ok(ok_response(result))
}

pub fn routes_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_routes))
        .route("/:route_id", get(get_route))
        .route("/:route_id/status", patch(update_route_status))
        .route("/:route_id/stops/:stop_id", patch(update_stop))
}
