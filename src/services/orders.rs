use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use validator::Validate;

use crate::{
    common::jst_now,
    db::DbPool,
    entities::{
        order::{self, Entity as OrderEntity, OrderStatus},
        order_item::{self, Entity as OrderItemEntity, ItemStatus},
        purchase_list_item::{self, Entity as PurchaseListItemEntity, PurchaseStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::scheduling,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderItemRequest {
    #[validate(length(min = 1, message = "SKU is required"))]
    pub sku: String,
    #[serde(default)]
    pub product_name: String,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub is_bundle: bool,
    #[serde(default = "default_priority")]
    pub priority: String,
}

fn default_priority() -> String {
    "normal".to_string()
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub external_order_id: Option<String>,
    pub source_channel: Option<String>,
    pub customer_name: Option<String>,
    /// Arrival timestamp, naive local time. Callers sending tz-aware values
    /// must convert before the boundary.
    pub order_date: NaiveDateTime,
    /// Pre-resolved target date; when absent the cutoff policy decides.
    pub target_purchase_date: Option<NaiveDate>,
    #[validate]
    #[serde(default)]
    pub items: Vec<CreateOrderItemRequest>,
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub item_id: i32,
    pub sku: String,
    pub product_name: String,
    pub quantity: i32,
    pub is_bundle: bool,
    pub parent_item_id: Option<i32>,
    pub status: ItemStatus,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order_id: i32,
    pub external_order_id: Option<String>,
    pub source_channel: Option<String>,
    pub customer_name: Option<String>,
    pub order_date: NaiveDateTime,
    pub target_purchase_date: Option<NaiveDate>,
    pub status: OrderStatus,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Debug, Serialize)]
pub struct OrderStats {
    pub total_orders: u64,
    pub pending_orders: u64,
    pub assigned_orders: u64,
    pub completed_orders: u64,
    pub failed_orders: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderListFilter {
    pub status: Option<OrderStatus>,
    pub target_date: Option<NaiveDate>,
    pub search: Option<String>,
    #[serde(default)]
    pub skip: u64,
    pub limit: Option<u64>,
}

/// Order intake and queries. Intake applies the cutoff policy and expands
/// bundles inside one transaction, so a committed order is always plannable.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    events: EventSender,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>, events: EventSender) -> Self {
        Self { db, events }
    }

    #[instrument(skip(self, request), fields(external_order_id = ?request.external_order_id))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let txn = self.db.begin().await?;

        let target_date = match request.target_purchase_date {
            Some(date) => date,
            None => scheduling::target_purchase_date(&txn, request.order_date).await?,
        };

        let now = jst_now();
        let order_row = order::ActiveModel {
            external_order_id: Set(request.external_order_id.clone()),
            source_channel: Set(request.source_channel.clone()),
            customer_name: Set(request.customer_name.clone()),
            order_date: Set(request.order_date),
            target_purchase_date: Set(Some(target_date)),
            status: Set(OrderStatus::Pending),
            created_at: Set(now),
            updated_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for item in &request.items {
            order_item::ActiveModel {
                order_id: Set(order_row.order_id),
                sku: Set(item.sku.clone()),
                product_name: Set(if item.product_name.is_empty() {
                    item.sku.clone()
                } else {
                    item.product_name.clone()
                }),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                is_bundle: Set(item.is_bundle),
                parent_item_id: Set(None),
                status: Set(ItemStatus::Pending),
                priority: Set(item.priority.clone()),
                created_at: Set(now),
                updated_at: Set(None),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        scheduling::expand_bundles(&txn, order_row.order_id).await?;
        txn.commit().await?;

        info!(order_id = order_row.order_id, %target_date, "order ingested");
        self.events
            .send(Event::OrderIngested {
                order_id: order_row.order_id,
                target_purchase_date: Some(target_date),
            })
            .await;

        self.get_order(order_row.order_id).await
    }

    /// Bulk intake; each order runs the same cutoff + bundle pipeline.
    #[instrument(skip(self, orders), fields(count = orders.len()))]
    pub async fn import_orders(
        &self,
        orders: Vec<CreateOrderRequest>,
    ) -> Result<Vec<i32>, ServiceError> {
        let mut created = Vec::with_capacity(orders.len());
        for request in orders {
            let response = self.create_order(request).await?;
            created.push(response.order_id);
        }
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: i32) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db;
        let order_row = OrderEntity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("注文が見つかりません".to_string()))?;

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::ItemId)
            .all(db)
            .await?;

        Ok(Self::to_response(order_row, items))
    }

    #[instrument(skip(self, filter))]
    pub async fn list_orders(
        &self,
        filter: OrderListFilter,
    ) -> Result<Vec<OrderResponse>, ServiceError> {
        let db = &*self.db;

        let mut query = OrderEntity::find();
        if let Some(status) = filter.status {
            query = query.filter(order::Column::Status.eq(status));
        }
        if let Some(date) = filter.target_date {
            query = query.filter(order::Column::TargetPurchaseDate.eq(date));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = format!("%{search}%");
            query = query.filter(
                Condition::any()
                    .add(order::Column::ExternalOrderId.like(pattern.clone()))
                    .add(order::Column::CustomerName.like(pattern)),
            );
        }

        let orders = query
            .order_by_desc(order::Column::OrderDate)
            .offset(filter.skip)
            .limit(filter.limit.unwrap_or(50))
            .all(db)
            .await?;

        let order_ids: Vec<i32> = orders.iter().map(|o| o.order_id).collect();
        let mut items_by_order: std::collections::HashMap<i32, Vec<order_item::Model>> =
            std::collections::HashMap::new();
        if !order_ids.is_empty() {
            for item in OrderItemEntity::find()
                .filter(order_item::Column::OrderId.is_in(order_ids))
                .order_by_asc(order_item::Column::ItemId)
                .all(db)
                .await?
            {
                items_by_order.entry(item.order_id).or_default().push(item);
            }
        }

        Ok(orders
            .into_iter()
            .map(|o| {
                let items = items_by_order.remove(&o.order_id).unwrap_or_default();
                Self::to_response(o, items)
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn order_stats(
        &self,
        target_date: Option<NaiveDate>,
    ) -> Result<OrderStats, ServiceError> {
        let db = &*self.db;

        let base = || {
            let mut q = OrderEntity::find();
            if let Some(date) = target_date {
                q = q.filter(order::Column::TargetPurchaseDate.eq(date));
            }
            q
        };

        let total_orders = base().count(db).await?;
        let pending_orders = base()
            .filter(order::Column::Status.eq(OrderStatus::Pending))
            .count(db)
            .await?;
        let assigned_orders = base()
            .filter(order::Column::Status.eq(OrderStatus::Assigned))
            .count(db)
            .await?;
        let completed_orders = base()
            .filter(order::Column::Status.eq(OrderStatus::Completed))
            .count(db)
            .await?;
        let failed_orders = base()
            .filter(order::Column::Status.eq(OrderStatus::Failed))
            .count(db)
            .await?;

        Ok(OrderStats {
            total_orders,
            pending_orders,
            assigned_orders,
            completed_orders,
            failed_orders,
        })
    }

    /// Delete an order and its planning records. Refused once any of its
    /// purchase tasks has left `pending`, i.e. execution has begun.
    #[instrument(skip(self))]
    pub async fn delete_order(&self, order_id: i32) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        let order_row = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("注文が見つかりません".to_string()))?;

        let item_ids: Vec<i32> = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|i| i.item_id)
            .collect();

        if !item_ids.is_empty() {
            let tasks = PurchaseListItemEntity::find()
                .filter(purchase_list_item::Column::ItemId.is_in(item_ids.clone()))
                .all(&txn)
                .await?;
            if tasks.iter().any(|t| t.status != PurchaseStatus::Pending) {
                return Err(ServiceError::Conflict(
                    "買付が開始された注文は削除できません".to_string(),
                ));
            }
            PurchaseListItemEntity::delete_many()
                .filter(purchase_list_item::Column::ItemId.is_in(item_ids))
                .exec(&txn)
                .await?;
        }

        OrderEntity::delete_by_id(order_row.order_id).exec(&txn).await?;
        txn.commit().await?;

        info!(order_id, "order deleted");
        Ok(())
    }

    fn to_response(order_row: order::Model, items: Vec<order_item::Model>) -> OrderResponse {
        OrderResponse {
            order_id: order_row.order_id,
            external_order_id: order_row.external_order_id,
            source_channel: order_row.source_channel,
            customer_name: order_row.customer_name,
            order_date: order_row.order_date,
            target_purchase_date: order_row.target_purchase_date,
            status: order_row.status,
            items: items
                .into_iter()
                .map(|i| OrderItemResponse {
                    item_id: i.item_id,
                    sku: i.sku,
                    product_name: i.product_name,
                    quantity: i.quantity,
                    is_bundle: i.is_bundle,
                    parent_item_id: i.parent_item_id,
                    status: i.status,
                })
                .collect(),
        }
    }
}
