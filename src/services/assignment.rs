use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder,
};
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    common::jst_now,
    entities::{
        order::{self, Entity as OrderEntity, OrderStatus},
        order_item::{self, Entity as OrderItemEntity, ItemStatus},
        purchase_list::{self, Entity as PurchaseListEntity, ListStatus},
        purchase_list_item::{self, Entity as PurchaseListItemEntity, PurchaseStatus},
        staff::{self, Entity as StaffEntity, StaffRole, StaffStatus},
        store::{self, Entity as StoreEntity},
    },
    errors::ServiceError,
    services::{
        allocation::{self, ItemAllocation},
        geo::{flat_distance, Centroid, Coordinates},
    },
};

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentSummary {
    pub message: String,
    /// Order items advanced to `assigned`.
    pub assigned_count: u64,
    /// Purchase-list tasks created (one per store allocation).
    pub assigned_tasks: u64,
    pub staff_count: u64,
    /// Items with a reported shortfall; they stay `pending` for a later run.
    pub short_items: u64,
    /// Items skipped entirely (no store, or nobody had capacity).
    pub skipped_items: u64,
}

impl AssignmentSummary {
    fn empty(message: &str, staff_count: u64) -> Self {
        Self {
            message: message.to_string(),
            assigned_count: 0,
            assigned_tasks: 0,
            staff_count,
            short_items: 0,
            skipped_items: 0,
        }
    }
}

/// Per-buyer working state during one assignment run.
struct BuyerState {
    staff: staff::Model,
    list: purchase_list::Model,
    load: i32,
    next_sequence: i32,
    start: Option<Coordinates>,
    centroid: Centroid,
    stores: HashSet<i32>,
    touched: bool,
}

impl BuyerState {
    /// Current affinity anchor: mean of assigned store coordinates, falling
    /// back to the buyer's own start point, then the office.
    fn position(&self, office: Coordinates) -> Coordinates {
        self.centroid.get().or(self.start).unwrap_or(office)
    }
}

/// Pick the buyer for one item: lowest centroid distance, halved when the
/// buyer already visits one of the item's stores, skipping buyers whose
/// projected load would exceed capacity. Ties resolve to the earlier buyer
/// in staff-id order.
fn choose_buyer(
    buyers: &[BuyerState],
    item_centroid: Coordinates,
    office: Coordinates,
    task_count: i32,
    alloc_stores: &HashSet<i32>,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;

    for (idx, buyer) in buyers.iter().enumerate() {
        if buyer.load + task_count > buyer.staff.max_daily_capacity {
            continue;
        }

        let mut score = flat_distance(buyer.position(office), item_centroid);
        if !buyer.stores.is_disjoint(alloc_stores) {
            score *= 0.5;
        }

        match best {
            Some((_, best_score)) if score >= best_score => {}
            _ => best = Some((idx, score)),
        }
    }

    best.map(|(idx, _)| idx)
}

async fn get_or_create_list<C: ConnectionTrait>(
    conn: &C,
    staff_id: i32,
    date: NaiveDate,
) -> Result<purchase_list::Model, ServiceError> {
    let existing = PurchaseListEntity::find()
        .filter(purchase_list::Column::StaffId.eq(staff_id))
        .filter(purchase_list::Column::PurchaseDate.eq(date))
        .one(conn)
        .await?;

    if let Some(list) = existing {
        return Ok(list);
    }

    let list = purchase_list::ActiveModel {
        staff_id: Set(staff_id),
        purchase_date: Set(date),
        status: Set(ListStatus::Draft),
        total_items: Set(0),
        total_stores: Set(0),
        created_at: Set(jst_now()),
        updated_at: Set(None),
        ..Default::default()
    };
    Ok(list.insert(conn).await?)
}

/// Append one purchase task per store allocation to the buyer's list and
/// update the running state.
async fn place_item<C: ConnectionTrait>(
    conn: &C,
    buyer: &mut BuyerState,
    item: &order_item::Model,
    alloc: &ItemAllocation,
    store_coords: &HashMap<i32, Coordinates>,
) -> Result<u64, ServiceError> {
    let mut tasks = 0u64;

    for store_alloc in &alloc.allocations {
        let task = purchase_list_item::ActiveModel {
            list_id: Set(buyer.list.list_id),
            item_id: Set(item.item_id),
            store_id: Set(store_alloc.store_id),
            quantity_to_purchase: Set(store_alloc.quantity),
            sequence_order: Set(buyer.next_sequence),
            status: Set(PurchaseStatus::Pending),
            failure_reason: Set(None),
            ..Default::default()
        };
        task.insert(conn).await?;

        buyer.next_sequence += 1;
        buyer.load += 1;
        buyer.stores.insert(store_alloc.store_id);
        if let Some(coords) = store_coords.get(&store_alloc.store_id) {
            buyer.centroid.push(*coords);
        }
        tasks += 1;
    }

    buyer.touched = true;
    Ok(tasks)
}

/// Refresh a list's counters and flip an off-duty buyer to idle once work
/// has been placed on them.
async fn finalize_buyer<C: ConnectionTrait>(
    conn: &C,
    buyer: &BuyerState,
) -> Result<(), ServiceError> {
    let items = PurchaseListItemEntity::find()
        .filter(purchase_list_item::Column::ListId.eq(buyer.list.list_id))
        .all(conn)
        .await?;
    let total_items = items.len() as i32;
    let total_stores = items
        .iter()
        .map(|i| i.store_id)
        .collect::<HashSet<_>>()
        .len() as i32;

    let mut list_model: purchase_list::ActiveModel = buyer.list.clone().into();
    list_model.total_items = Set(total_items);
    list_model.total_stores = Set(total_stores);
    list_model.updated_at = Set(Some(jst_now()));
    list_model.update(conn).await?;

    if buyer.touched && buyer.staff.status == StaffStatus::OffDuty {
        let mut staff_model: staff::ActiveModel = buyer.staff.clone().into();
        staff_model.status = Set(StaffStatus::Idle);
        staff_model.updated_at = Set(Some(jst_now()));
        staff_model.update(conn).await?;
    }

    Ok(())
}

/// Assign the day's pending items to the active buyer pool.
///
/// Allocation decides *where* each item is bought; this stage decides *who*
/// buys it, keeping each buyer's stops spatially clustered via a running
/// centroid and respecting `max_daily_capacity`. Items nobody can take stay
/// pending.
#[instrument(skip(conn))]
pub async fn assign_day<C: ConnectionTrait>(
    conn: &C,
    office: Coordinates,
    date: NaiveDate,
) -> Result<AssignmentSummary, ServiceError> {
    let buyers = StaffEntity::find()
        .filter(staff::Column::IsActive.eq(true))
        .filter(staff::Column::Role.eq(StaffRole::Buyer))
        .filter(staff::Column::Status.ne(StaffStatus::OffDuty))
        .order_by_asc(staff::Column::StaffId)
        .all(conn)
        .await?;

    if buyers.is_empty() {
        return Ok(AssignmentSummary::empty("稼働中のスタッフがいません", 0));
    }
    let staff_count = buyers.len() as u64;

    let pending_orders = OrderEntity::find()
        .filter(order::Column::TargetPurchaseDate.eq(date))
        .filter(order::Column::Status.eq(OrderStatus::Pending))
        .all(conn)
        .await?;
    if pending_orders.is_empty() {
        return Ok(AssignmentSummary::empty(
            "割当対象の注文がありません",
            staff_count,
        ));
    }

    let order_ids: Vec<i32> = pending_orders.iter().map(|o| o.order_id).collect();
    let pending_items = OrderItemEntity::find()
        .filter(order_item::Column::OrderId.is_in(order_ids.clone()))
        .filter(order_item::Column::Status.eq(ItemStatus::Pending))
        .filter(order_item::Column::IsBundle.eq(false))
        .order_by_asc(order_item::Column::ItemId)
        .all(conn)
        .await?;
    if pending_items.is_empty() {
        return Ok(AssignmentSummary::empty(
            "割当対象のアイテムがありません",
            staff_count,
        ));
    }

    // Build buyer states: list, current workload, store set, centroid seeded
    // from the stores already on the list.
    let mut states: Vec<BuyerState> = Vec::with_capacity(buyers.len());
    for buyer in buyers {
        let list = get_or_create_list(conn, buyer.staff_id, date).await?;
        let existing = PurchaseListItemEntity::find()
            .filter(purchase_list_item::Column::ListId.eq(list.list_id))
            .all(conn)
            .await?;

        let load = existing.len() as i32;
        let next_sequence = existing
            .iter()
            .map(|i| i.sequence_order)
            .max()
            .unwrap_or(0)
            + 1;
        let stores: HashSet<i32> = existing.iter().map(|i| i.store_id).collect();

        let mut centroid = Centroid::default();
        if !stores.is_empty() {
            let coords_rows = StoreEntity::find()
                .filter(store::Column::StoreId.is_in(stores.iter().copied().collect::<Vec<_>>()))
                .all(conn)
                .await?;
            for row in coords_rows {
                if let Some(c) = Coordinates::from_decimals(row.latitude, row.longitude) {
                    centroid.push(c);
                }
            }
        }

        states.push(BuyerState {
            start: Coordinates::from_decimals(
                buyer.start_location_lat,
                buyer.start_location_lng,
            ),
            staff: buyer,
            list,
            load,
            next_sequence,
            centroid,
            stores,
            touched: false,
        });
    }

    let allocations = allocation::allocate(conn, &pending_items, None).await?;

    let referenced_store_ids: Vec<i32> = allocations
        .values()
        .flat_map(ItemAllocation::store_ids)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let store_coords: HashMap<i32, Coordinates> = if referenced_store_ids.is_empty() {
        HashMap::new()
    } else {
        StoreEntity::find()
            .filter(store::Column::StoreId.is_in(referenced_store_ids))
            .all(conn)
            .await?
            .into_iter()
            .filter_map(|s| {
                Coordinates::from_decimals(s.latitude, s.longitude).map(|c| (s.store_id, c))
            })
            .collect()
    };

    let mut assigned_count = 0u64;
    let mut assigned_tasks = 0u64;
    let mut short_items = 0u64;
    let mut skipped_items = 0u64;

    for item in &pending_items {
        let Some(alloc) = allocations.get(&item.item_id) else {
            skipped_items += 1;
            continue;
        };
        if alloc.allocations.is_empty() {
            skipped_items += 1;
            continue;
        }

        let alloc_stores: HashSet<i32> = alloc.store_ids().into_iter().collect();
        let coords: Vec<Coordinates> = alloc_stores
            .iter()
            .filter_map(|id| store_coords.get(id).copied())
            .collect();
        let item_centroid = crate::services::geo::mean_position(&coords).unwrap_or(office);

        let task_count = alloc.allocations.len() as i32;
        let Some(chosen) = choose_buyer(&states, item_centroid, office, task_count, &alloc_stores)
        else {
            skipped_items += 1;
            continue;
        };

        assigned_tasks += place_item(conn, &mut states[chosen], item, alloc, &store_coords).await?;

        if alloc.remaining_quantity > 0 {
            // Partial fulfillment: the placed tasks commit, the item stays
            // pending so a later run can cover the remainder.
            short_items += 1;
            continue;
        }

        let mut item_model: order_item::ActiveModel = item.clone().into();
        item_model.status = Set(ItemStatus::Assigned);
        item_model.updated_at = Set(Some(jst_now()));
        item_model.update(conn).await?;
        assigned_count += 1;
    }

    // Orders whose items are all placed advance to assigned.
    let still_pending = OrderItemEntity::find()
        .filter(order_item::Column::OrderId.is_in(order_ids))
        .filter(order_item::Column::Status.eq(ItemStatus::Pending))
        .all(conn)
        .await?;
    let orders_with_pending: HashSet<i32> = still_pending.iter().map(|i| i.order_id).collect();
    for order in &pending_orders {
        if !orders_with_pending.contains(&order.order_id) {
            let mut order_model: order::ActiveModel = order.clone().into();
            order_model.status = Set(OrderStatus::Assigned);
            order_model.updated_at = Set(Some(jst_now()));
            order_model.update(conn).await?;
        }
    }

    for state in &states {
        finalize_buyer(conn, state).await?;
    }

    info!(
        %date,
        assigned_count,
        assigned_tasks,
        staff_count,
        short_items,
        skipped_items,
        "daily assignment finished"
    );

    Ok(AssignmentSummary {
        message: format!(
            "{assigned_count}件のアイテムを{staff_count}名のスタッフに割り当てました"
        ),
        assigned_count,
        assigned_tasks,
        staff_count,
        short_items,
        skipped_items,
    })
}

/// Fill one buyer up to capacity with the date's pending items.
#[instrument(skip(conn))]
pub async fn assign_to_staff<C: ConnectionTrait>(
    conn: &C,
    office: Coordinates,
    staff_id: i32,
    date: NaiveDate,
) -> Result<AssignmentSummary, ServiceError> {
    let buyer = StaffEntity::find_by_id(staff_id)
        .one(conn)
        .await?
        .filter(|s| s.is_active)
        .ok_or_else(|| ServiceError::NotFound("スタッフが見つかりません".to_string()))?;

    let list = get_or_create_list(conn, staff_id, date).await?;
    let existing = PurchaseListItemEntity::find()
        .filter(purchase_list_item::Column::ListId.eq(list.list_id))
        .all(conn)
        .await?;
    let load = existing.len() as i32;
    if load >= buyer.max_daily_capacity {
        return Err(ServiceError::CapacityExhausted(
            "このスタッフは容量上限に達しています".to_string(),
        ));
    }

    let pending_items = OrderItemEntity::find()
        .inner_join(OrderEntity)
        .filter(order::Column::TargetPurchaseDate.eq(date))
        .filter(order_item::Column::Status.eq(ItemStatus::Pending))
        .filter(order_item::Column::IsBundle.eq(false))
        .order_by_asc(order_item::Column::ItemId)
        .all(conn)
        .await?;
    if pending_items.is_empty() {
        return Ok(AssignmentSummary::empty("割当対象のアイテムがありません", 1));
    }

    let staff_start = Coordinates::from_decimals(buyer.start_location_lat, buyer.start_location_lng);
    let allocations = allocation::allocate(conn, &pending_items, staff_start).await?;

    let mut state = BuyerState {
        start: staff_start,
        staff: buyer,
        list,
        load,
        next_sequence: existing.iter().map(|i| i.sequence_order).max().unwrap_or(0) + 1,
        centroid: Centroid::default(),
        stores: existing.iter().map(|i| i.store_id).collect(),
        touched: false,
    };

    let mut assigned_count = 0u64;
    let mut assigned_tasks = 0u64;
    let mut short_items = 0u64;

    for item in &pending_items {
        let Some(alloc) = allocations.get(&item.item_id) else {
            continue;
        };
        if alloc.allocations.is_empty() {
            continue;
        }
        let task_count = alloc.allocations.len() as i32;
        if state.load + task_count > state.staff.max_daily_capacity {
            continue;
        }

        assigned_tasks += place_item(conn, &mut state, item, alloc, &HashMap::new()).await?;

        if alloc.remaining_quantity > 0 {
            short_items += 1;
            continue;
        }
        let mut item_model: order_item::ActiveModel = item.clone().into();
        item_model.status = Set(ItemStatus::Assigned);
        item_model.updated_at = Set(Some(jst_now()));
        item_model.update(conn).await?;
        assigned_count += 1;
    }

    finalize_buyer(conn, &state).await?;

    Ok(AssignmentSummary {
        message: format!("{assigned_count}件のアイテムを割り当てました"),
        assigned_count,
        assigned_tasks,
        staff_count: 1,
        short_items,
        skipped_items: 0,
    })
}
