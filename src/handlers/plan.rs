use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::AuthenticatedStaff,
    errors::ApiError,
    handlers::common::ok_response,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct PlanQuery {
    pub date: NaiveDate,
}

/// POST /plan/assign?date=YYYY-MM-DD — pack pending items into buyer lists.
async fn assign_day(
    State(state): State<Arc<AppState>>,
    _staff: AuthenticatedStaff,
    Query(query): Query<PlanQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state.services.planner.assign_day(query.date).await?;
    Ok(ok_response(summary))
}

/// POST /plan/assign/{staff_id}?date= — fill one buyer to capacity.
async fn assign_staff(
    State(state): State<Arc<AppState>>,
    _staff: AuthenticatedStaff,
    Path(staff_id): Path<i32>,
    Query(query): Query<PlanQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state
        .services
        .planner
        .assign_staff(staff_id, query.date)
        .await?;
    Ok(ok_response(summary))
}

/// POST /plan/routes?date= — regenerate optimized routes for all buyers.
async fn generate_routes(
    State(state): State<Arc<AppState>>,
    _staff: AuthenticatedStaff,
    Query(query): Query<PlanQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let route_ids = state.services.planner.generate_routes(query.date).await?;
    Ok(ok_response(json!({
        "message": format!("{}件のルートを生成しました", route_ids.len()),
        "routes_count": route_ids.len(),
        "route_ids": route_ids,
    })))
}

/// POST /plan/dispatch?date= — the full pipeline with auto-start.
async fn dispatch_day(
    State(state): State<Arc<AppState>>,
    _staff: AuthenticatedStaff,
    Query(query): Query<PlanQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state.services.planner.plan_day(query.date, true).await?;
    Ok(ok_response(summary))
}

/// POST /plan/start?date= — start every generated route on the date.
async fn start_routes(
    State(state): State<Arc<AppState>>,
    _staff: AuthenticatedStaff,
    Query(query): Query<PlanQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let count = state.services.planner.start_routes(query.date).await?;
    Ok(ok_response(json!({
        "message": format!("{count}件のルートを開始しました"),
        "count": count,
    })))
}

pub fn plan_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/assign", post(assign_day))
        .route("/assign/:staff_id", post(assign_staff))
        .route("/routes", post(generate_routes))
        .route("/dispatch", post(dispatch_day))
        .route("/start", post(start_routes))
}
