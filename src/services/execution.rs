use std::collections::HashSet;

use chrono::NaiveDateTime;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{
    auth::{can_update_stop, AuthenticatedStaff},
    common::jst_now,
    entities::{
        order::{self, Entity as OrderEntity, OrderStatus},
        order_item::{self, Entity as OrderItemEntity, ItemStatus},
        purchase_failure::{self, Entity as PurchaseFailureEntity, FailureType},
        purchase_list::{self, Entity as PurchaseListEntity, ListStatus},
        purchase_list_item::{self, Entity as PurchaseListItemEntity, PurchaseStatus},
        route::{self, Entity as RouteEntity, RouteStatus},
        route_stop::{self, Entity as RouteStopEntity, StopStatus},
    },
    errors::ServiceError,
};

#[derive(Debug, Clone, Deserialize)]
pub struct StopUpdate {
    pub stop_status: StopStatus,
    pub actual_arrival: Option<NaiveDateTime>,
    pub actual_departure: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StopUpdateResult {
    pub message: String,
    pub stop_id: i32,
    pub new_status: StopStatus,
    pub route_completed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FailureReport {
    pub list_item_id: i32,
    pub item_id: i32,
    pub store_id: i32,
    pub failure_type: FailureType,
    pub expected_restock_date: Option<chrono::NaiveDate>,
    pub alternative_store_id: Option<i32>,
    pub notes: Option<String>,
}

/// Advance every order whose items changed: all purchased → completed, some
/// purchased → partially completed.
async fn cascade_order_statuses<C: ConnectionTrait>(
    conn: &C,
    order_ids: &HashSet<i32>,
    now: NaiveDateTime,
) -> Result<(), ServiceError> {
    for &order_id in order_ids {
        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .filter(order_item::Column::IsBundle.eq(false))
            .all(conn)
            .await?;
        if items.is_empty() {
            continue;
        }

        let purchased = items
            .iter()
            .filter(|i| i.status == ItemStatus::Purchased)
            .count();
        let new_status = if purchased == items.len() {
            Some(OrderStatus::Completed)
        } else if purchased > 0 {
            Some(OrderStatus::PartiallyCompleted)
        } else {
            None
        };

        if let Some(status) = new_status {
            let Some(owning) = OrderEntity::find_by_id(order_id).one(conn).await? else {
                continue;
            };
            if owning.status != status {
                let mut active: order::ActiveModel = owning.into();
                active.status = Set(status);
                active.updated_at = Set(Some(now));
                active.update(conn).await?;
            }
        }
    }
    Ok(())
}

/// Update one stop's status and propagate completion.
///
/// Completing a stop marks every purchase task at that store purchased,
/// advances the touched order items and orders, and completes the route and
/// its purchase list once the last stop is done. Only the assigned buyer or
/// a supervisor/admin may update.
#[instrument(skip(conn, update), fields(new_status = ?update.stop_status))]
pub async fn update_stop_status<C: ConnectionTrait>(
    conn: &C,
    actor: &AuthenticatedStaff,
    route_id: i32,
    stop_id: i32,
    update: StopUpdate,
) -> Result<StopUpdateResult, ServiceError> {
    let route_row = RouteEntity::find_by_id(route_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound("ルートが見つかりません".to_string()))?;

    if !can_update_stop(actor, route_row.staff_id) {
        return Err(ServiceError::Forbidden(
            "このルートを更新する権限がありません".to_string(),
        ));
    }

    let stop = RouteStopEntity::find_by_id(stop_id)
        .one(conn)
        .await?
        .filter(|s| s.route_id == route_id)
        .ok_or_else(|| ServiceError::NotFound("ストップが見つかりません".to_string()))?;

    let now = jst_now();
    let previous_status = stop.status;
    let store_id = stop.store_id;

    let mut stop_model: route_stop::ActiveModel = stop.into();
    stop_model.status = Set(update.stop_status);
    if let Some(arrival) = update.actual_arrival {
        stop_model.actual_arrival = Set(Some(arrival));
    }
    if let Some(departure) = update.actual_departure {
        stop_model.actual_departure = Set(Some(departure));
    }
    stop_model.update(conn).await?;

    // First activity moves the route out of not_started.
    if route_row.status == RouteStatus::NotStarted
        && matches!(update.stop_status, StopStatus::Current | StopStatus::Completed)
    {
        let mut route_model: route::ActiveModel = route_row.clone().into();
        route_model.status = Set(RouteStatus::InProgress);
        route_model.updated_at = Set(Some(now));
        route_model.update(conn).await?;
    }

    if update.stop_status == StopStatus::Completed && previous_status != StopStatus::Completed {
        let tasks = PurchaseListItemEntity::find()
            .filter(purchase_list_item::Column::ListId.eq(route_row.list_id))
            .filter(purchase_list_item::Column::StoreId.eq(store_id))
            .all(conn)
            .await?;

        let mut touched_orders: HashSet<i32> = HashSet::new();
        for task in &tasks {
            if task.status != PurchaseStatus::Purchased {
                let mut task_model: purchase_list_item::ActiveModel = task.clone().into();
                task_model.status = Set(PurchaseStatus::Purchased);
                task_model.update(conn).await?;
            }

            let Some(item) = OrderItemEntity::find_by_id(task.item_id).one(conn).await? else {
                continue;
            };
            touched_orders.insert(item.order_id);
            if item.status != ItemStatus::Purchased {
                let mut item_model: order_item::ActiveModel = item.into();
                item_model.status = Set(ItemStatus::Purchased);
                item_model.updated_at = Set(Some(now));
                item_model.update(conn).await?;
            }
        }

        cascade_order_statuses(conn, &touched_orders, now).await?;
    }

    // Route completion: every stop done.
    let stops = RouteStopEntity::find()
        .filter(route_stop::Column::RouteId.eq(route_id))
        .all(conn)
        .await?;
    let route_completed = !stops.is_empty()
        && stops.iter().all(|s| s.status == StopStatus::Completed);

    if route_completed && route_row.status != RouteStatus::Completed {
        let route_row = RouteEntity::find_by_id(route_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("ルートが見つかりません".to_string()))?;
        let list_id = route_row.list_id;
        let mut route_model: route::ActiveModel = route_row.into();
        route_model.status = Set(RouteStatus::Completed);
        route_model.updated_at = Set(Some(now));
        route_model.update(conn).await?;

        if let Some(list) = PurchaseListEntity::find_by_id(list_id).one(conn).await? {
            if list.status != ListStatus::Completed {
                let mut list_model: purchase_list::ActiveModel = list.into();
                list_model.status = Set(ListStatus::Completed);
                list_model.updated_at = Set(Some(now));
                list_model.update(conn).await?;
            }
        }
    }

    info!(
        route_id,
        stop_id,
        ?previous_status,
        new_status = ?update.stop_status,
        route_completed,
        "stop status updated"
    );

    Ok(StopUpdateResult {
        message: "ストップを更新しました".to_string(),
        stop_id,
        new_status: update.stop_status,
        route_completed,
    })
}

/// Record a purchase failure observed in the field.
///
/// Flips the purchase task and its order item to failed and stores the
/// analytics record. No automatic retry or re-allocation happens here.
#[instrument(skip(conn, report), fields(list_item_id = report.list_item_id))]
pub async fn record_failure<C: ConnectionTrait>(
    conn: &C,
    report: FailureReport,
) -> Result<i32, ServiceError> {
    let task = PurchaseListItemEntity::find_by_id(report.list_item_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound("購入リストアイテムが見つかりません".to_string())
        })?;

    let now = jst_now();
    let failure = purchase_failure::ActiveModel {
        list_item_id: Set(report.list_item_id),
        item_id: Set(report.item_id),
        store_id: Set(report.store_id),
        failure_type: Set(report.failure_type),
        failure_date: Set(now),
        expected_restock_date: Set(report.expected_restock_date),
        alternative_store_id: Set(report.alternative_store_id),
        notes: Set(report.notes.clone()),
        ..Default::default()
    };
    let failure_id = PurchaseFailureEntity::insert(failure)
        .exec(conn)
        .await?
        .last_insert_id;

    let mut task_model: purchase_list_item::ActiveModel = task.into();
    task_model.status = Set(PurchaseStatus::Failed);
    task_model.failure_reason = Set(Some(report.failure_type.to_string()));
    task_model.update(conn).await?;

    if let Some(item) = OrderItemEntity::find_by_id(report.item_id).one(conn).await? {
        if item.status != ItemStatus::Failed {
            let mut item_model: order_item::ActiveModel = item.into();
            item_model.status = Set(ItemStatus::Failed);
            item_model.updated_at = Set(Some(now));
            item_model.update(conn).await?;
        }
    }

    info!(failure_id, item_id = report.item_id, store_id = report.store_id, "purchase failure recorded");
    Ok(failure_id)
}
