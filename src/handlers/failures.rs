use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait};
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::AuthenticatedStaff,
    entities::purchase_failure::{self, Entity as PurchaseFailureEntity, FailureType},
    errors::{ApiError, ServiceError},
    handlers::common::{created_response, ok_response},
    services::execution::{self, FailureReport},
    AppState,
};

/// POST /failures — record an observed purchase failure.
async fn record_failure(
    State(state): State<Arc<AppState>>,
    _staff: AuthenticatedStaff,
    Json(report): Json<FailureReport>,
) -> Result<impl IntoResponse, ApiError> {
    let item_id = report.item_id;
    let store_id = report.store_id;

    let txn = state
        .db
        .begin()
        .await
        .map_err(|e| ApiError::from(ServiceError::from(e)))?;
    let failure_id = execution::record_failure(&txn, report).await?;
    txn.commit()
        .await
        .map_err(|e| ApiError::from(ServiceError::from(e)))?;

    state
        .events
        .send(crate::events::Event::PurchaseFailureRecorded {
            failure_id,
            item_id,
            store_id,
        })
        .await;

    Ok(created_response(json!({
        "message": "購入失敗を記録しました",
        "failure_id": failure_id,
    })))
}

#[derive(Debug, Deserialize)]
struct FailureListQuery {
    failure_type: Option<FailureType>,
    #[serde(default)]
    skip: u64,
    limit: Option<u64>,
}

/// GET /failures?failure_type=
async fn list_failures(
    State(state): State<Arc<AppState>>,
    _staff: AuthenticatedStaff,
    Query(query): Query<FailureListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut find = PurchaseFailureEntity::find();
    if let Some(failure_type) = query.failure_type {
        find = find.filter(purchase_failure::Column::FailureType.eq(failure_type));
    }

    let failures = find
        .order_by_desc(purchase_failure::Column::FailureDate)
        .offset(query.skip)
        .limit(query.limit.unwrap_or(50))
        .all(&*state.db)
        .await
        .map_err(|e| ApiError::from(ServiceError::from(e)))?;

    Ok(ok_response(failures))
}

pub fn failure_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", post(record_failure).get(list_failures))
}
