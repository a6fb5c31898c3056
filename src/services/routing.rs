use std::collections::{HashMap, HashSet};

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder,
};
use serde_json::json;
use tracing::{info, instrument};

use crate::{
    common::jst_now,
    entities::{
        order::{self, Entity as OrderEntity, OrderStatus},
        order_item::{self, Entity as OrderItemEntity},
        purchase_list::{self, Entity as PurchaseListEntity, ListStatus},
        purchase_list_item::{self, Entity as PurchaseListItemEntity},
        route::{self, Entity as RouteEntity, RouteStatus},
        route_stop::{self, Entity as RouteStopEntity, StopStatus},
        staff::{self, Entity as StaffEntity, StaffRole},
        store::{self, Entity as StoreEntity},
    },
    errors::ServiceError,
    services::{
        distance_matrix,
        geo::{self, Coordinates},
        settings::{OptimizationPriority, PlanningPolicy},
    },
};

/// Route execution starts at 10:00 local.
fn route_start() -> NaiveTime {
    NaiveTime::from_hms_opt(10, 0, 0).expect("valid route start time")
}

/// Base minutes spent at a store plus minutes per unit to purchase.
const SHOPPING_BASE_MINUTES: i64 = 5;
const SHOPPING_MINUTES_PER_UNIT: i64 = 2;

/// 2-opt keeps applying reversals while they shave off more than this.
const TWO_OPT_MIN_IMPROVEMENT_KM: f64 = 0.01;
const TWO_OPT_MAX_PASSES: usize = 50;

/// Opening-hours pass: swap forward when the projected wait exceeds this and
/// the detour costs less than the penalty cap.
const WAIT_SWAP_THRESHOLD_MINUTES: i64 = 10;
const DETOUR_PENALTY_CAP_KM: f64 = 2.0;

/// One store visit before sequencing: aggregated tasks, coordinates and the
/// opening window already resolved for the route's weekday.
#[derive(Debug, Clone)]
pub(crate) struct StopCandidate {
    pub store_id: i32,
    pub coords: Option<Coordinates>,
    /// Number of purchase tasks at this store.
    pub task_count: i64,
    /// Total units to buy; drives the shopping-time estimate.
    pub total_quantity: i64,
    pub opening: Option<(NaiveTime, NaiveTime)>,
    pub item_ids: Vec<i32>,
}

/// Distance oracle: cached matrix entries first, Haversine fallback, zero
/// when either endpoint has no coordinates.
pub(crate) struct DistanceLookup {
    cache: HashMap<(i32, i32), f64>,
}

impl DistanceLookup {
    pub fn new(cache: HashMap<(i32, i32), f64>) -> Self {
        Self { cache }
    }

    fn between(
        &self,
        from_store: Option<i32>,
        from: Option<Coordinates>,
        to_store: i32,
        to: Option<Coordinates>,
    ) -> f64 {
        if let Some(from_id) = from_store {
            if let Some(&cached) = self.cache.get(&(from_id, to_store)) {
                return cached;
            }
        }
        match (from, to) {
            (Some(a), Some(b)) => geo::haversine_km(a, b),
            _ => 0.0,
        }
    }
}

/// Total length of the open path start → stops[0] → … → stops[n-1].
fn tour_cost(start: Coordinates, stops: &[StopCandidate], dist: &DistanceLookup) -> f64 {
    let mut cost = 0.0;
    let mut prev_store: Option<i32> = None;
    let mut prev_coords = Some(start);

    for stop in stops {
        cost += dist.between(prev_store, prev_coords, stop.store_id, stop.coords);
        if stop.coords.is_some() {
            prev_store = Some(stop.store_id);
            prev_coords = stop.coords;
        }
    }
    cost
}

/// Nearest-Neighbor seed from the start point. Stores without coordinates
/// are deferred to the tail in their incoming order.
pub(crate) fn nearest_neighbor(
    start: Coordinates,
    stops: Vec<StopCandidate>,
    dist: &DistanceLookup,
) -> Vec<StopCandidate> {
    let (mut remaining, tail): (Vec<_>, Vec<_>) =
        stops.into_iter().partition(|s| s.coords.is_some());

    let mut ordered = Vec::with_capacity(remaining.len() + tail.len());
    let mut current_store: Option<i32> = None;
    let mut current_coords = start;

    while !remaining.is_empty() {
        let mut nearest_idx = 0;
        let mut nearest_dist = f64::INFINITY;
        for (idx, stop) in remaining.iter().enumerate() {
            let d = dist.between(current_store, Some(current_coords), stop.store_id, stop.coords);
            if d < nearest_dist {
                nearest_dist = d;
                nearest_idx = idx;
            }
        }
        let stop = remaining.remove(nearest_idx);
        current_store = Some(stop.store_id);
        current_coords = stop.coords.expect("partitioned on coords");
        ordered.push(stop);
    }

    ordered.extend(tail);
    ordered
}

/// 2-opt improvement over the geo-located prefix of the tour.
///
/// Evaluates every segment reversal against the full open-path cost and
/// applies any improvement above the threshold, up to a bounded number of
/// passes. Re-running on the result is a fixed point.
pub(crate) fn two_opt(
    start: Coordinates,
    mut stops: Vec<StopCandidate>,
    dist: &DistanceLookup,
) -> Vec<StopCandidate> {
    let geo_len = stops.iter().take_while(|s| s.coords.is_some()).count();
    if geo_len < 3 {
        return stops;
    }

    let mut best_cost = tour_cost(start, &stops[..geo_len], dist);

    for _ in 0..TWO_OPT_MAX_PASSES {
        let mut improved = false;

        for i in 0..geo_len - 1 {
            for j in i + 1..geo_len {
                stops[i..=j].reverse();
                let candidate_cost = tour_cost(start, &stops[..geo_len], dist);
                if best_cost - candidate_cost > TWO_OPT_MIN_IMPROVEMENT_KM {
                    best_cost = candidate_cost;
                    improved = true;
                } else {
                    stops[i..=j].reverse();
                }
            }
        }

        if !improved {
            break;
        }
    }

    stops
}

/// Result of walking the tour against the clock.
#[derive(Debug, Clone)]
pub(crate) struct Schedule {
    pub arrivals: Vec<NaiveDateTime>,
    pub total_distance_km: f64,
    pub total_minutes: i64,
}

fn shopping_minutes(stop: &StopCandidate) -> i64 {
    SHOPPING_BASE_MINUTES + SHOPPING_MINUTES_PER_UNIT * stop.total_quantity.max(stop.task_count)
}

/// Simulate the day: travel at the urban speed, wait out closed doors,
/// shop, move on. Wait time counts toward the route total.
pub(crate) fn simulate_schedule(
    start: Coordinates,
    date: NaiveDate,
    stops: &[StopCandidate],
    dist: &DistanceLookup,
) -> Schedule {
    let mut clock = date.and_time(route_start());
    let mut total_distance = 0.0;
    let mut total_minutes = 0i64;
    let mut arrivals = Vec::with_capacity(stops.len());

    let mut prev_store: Option<i32> = None;
    let mut prev_coords = Some(start);

    for stop in stops {
        let leg = dist.between(prev_store, prev_coords, stop.store_id, stop.coords);
        let travel = geo::travel_minutes(leg);
        total_distance += leg;
        clock += Duration::minutes(travel);

        let mut wait = 0i64;
        if let Some((opens_at, _)) = stop.opening {
            let door_open = date.and_time(opens_at);
            if door_open > clock {
                wait = (door_open - clock).num_minutes();
                clock = door_open;
            }
        }

        arrivals.push(clock);

        let shopping = shopping_minutes(stop);
        clock += Duration::minutes(shopping);
        total_minutes += travel + wait + shopping;

        if stop.coords.is_some() {
            prev_store = Some(stop.store_id);
            prev_coords = stop.coords;
        }
    }

    Schedule {
        arrivals,
        total_distance_km: total_distance,
        total_minutes,
    }
}

/// Opening-hours pass (speed priority only): when a stop's doors open well
/// after the projected arrival, try swapping it with its successor if the
/// successor would already be open and the extra distance stays under the
/// detour cap.
pub(crate) fn reorder_for_opening_hours(
    start: Coordinates,
    date: NaiveDate,
    mut stops: Vec<StopCandidate>,
    dist: &DistanceLookup,
) -> Vec<StopCandidate> {
    let geo_len = stops.iter().take_while(|s| s.coords.is_some()).count();
    if geo_len < 2 {
        return stops;
    }

    let mut idx = 0;
    while idx + 1 < geo_len {
        let schedule = simulate_schedule(start, date, &stops[..geo_len], dist);
        let arrival = schedule.arrivals[idx];

        let wait = match stops[idx].opening {
            Some((opens_at, _)) => (date.and_time(opens_at) - arrival).num_minutes(),
            None => 0,
        };

        if wait > WAIT_SWAP_THRESHOLD_MINUTES {
            let successor_open = match stops[idx + 1].opening {
                Some((opens_at, _)) => date.and_time(opens_at) <= arrival,
                None => true,
            };

            if successor_open {
                let old_cost = tour_cost(start, &stops[..geo_len], dist);
                stops.swap(idx, idx + 1);
                let new_cost = tour_cost(start, &stops[..geo_len], dist);
                if new_cost - old_cost < DETOUR_PENALTY_CAP_KM {
                    idx += 1;
                    continue;
                }
                stops.swap(idx, idx + 1);
            }
        }

        idx += 1;
    }

    stops
}

/// Resolve a store's opening window for one weekday from its JSON mapping
/// (keys "mon".."sun", values "HH:MM-HH:MM").
pub(crate) fn opening_window(
    hours: &serde_json::Value,
    weekday: Weekday,
) -> Option<(NaiveTime, NaiveTime)> {
    let key = match weekday {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    };
    let window = hours.get(key)?.as_str()?;
    let (open_str, close_str) = window.split_once('-')?;
    let open = NaiveTime::parse_from_str(open_str.trim(), "%H:%M").ok()?;
    let close = NaiveTime::parse_from_str(close_str.trim(), "%H:%M").ok()?;
    Some((open, close))
}

/// Generate (or regenerate) the optimized route for one buyer's purchase
/// list. Returns `None` when the list is empty.
#[instrument(skip(conn, policy))]
pub async fn optimize_for_staff<C: ConnectionTrait>(
    conn: &C,
    policy: &PlanningPolicy,
    office: Coordinates,
    staff_id: i32,
    date: NaiveDate,
) -> Result<Option<i32>, ServiceError> {
    let buyer = StaffEntity::find_by_id(staff_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound("スタッフが見つかりません".to_string()))?;

    let Some(list) = PurchaseListEntity::find()
        .filter(purchase_list::Column::StaffId.eq(staff_id))
        .filter(purchase_list::Column::PurchaseDate.eq(date))
        .one(conn)
        .await?
    else {
        return Ok(None);
    };

    let tasks = PurchaseListItemEntity::find()
        .filter(purchase_list_item::Column::ListId.eq(list.list_id))
        .all(conn)
        .await?;
    if tasks.is_empty() {
        return Ok(None);
    }

    // Aggregate tasks per distinct store.
    let store_ids: Vec<i32> = tasks
        .iter()
        .map(|t| t.store_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let stores: HashMap<i32, store::Model> = StoreEntity::find()
        .filter(store::Column::StoreId.is_in(store_ids.clone()))
        .all(conn)
        .await?
        .into_iter()
        .map(|s| (s.store_id, s))
        .collect();

    let mut candidates: Vec<StopCandidate> = Vec::new();
    for store_id in &store_ids {
        let store_tasks: Vec<&purchase_list_item::Model> =
            tasks.iter().filter(|t| t.store_id == *store_id).collect();
        let store_row = stores.get(store_id);
        let mut item_ids: Vec<i32> = store_tasks.iter().map(|t| t.item_id).collect();
        item_ids.sort_unstable();
        item_ids.dedup();

        candidates.push(StopCandidate {
            store_id: *store_id,
            coords: store_row
                .and_then(|s| Coordinates::from_decimals(s.latitude, s.longitude)),
            task_count: store_tasks.len() as i64,
            total_quantity: store_tasks
                .iter()
                .map(|t| i64::from(t.quantity_to_purchase))
                .sum(),
            opening: store_row
                .and_then(|s| s.opening_hours.as_ref())
                .and_then(|h| opening_window(h, date.weekday())),
            item_ids,
        });
    }
    // Deterministic input order so equal-distance choices never depend on
    // hash iteration.
    candidates.sort_by_key(|c| c.store_id);

    let start = Coordinates::from_decimals(buyer.start_location_lat, buyer.start_location_lng)
        .unwrap_or(office);

    let dist = DistanceLookup::new(distance_matrix::submatrix(conn, &store_ids).await?);

    let seeded = nearest_neighbor(start, candidates, &dist);
    let mut ordered = two_opt(start, seeded, &dist);
    if policy.optimization_priority == OptimizationPriority::Speed {
        ordered = reorder_for_opening_hours(start, date, ordered, &dist);
    }
    let schedule = simulate_schedule(start, date, &ordered, &dist);

    let now = jst_now();
    let route_model = RouteEntity::find()
        .filter(route::Column::ListId.eq(list.list_id))
        .one(conn)
        .await?;

    let route_id = match route_model {
        Some(existing) => {
            // Regeneration keeps the row so execution references stay valid.
            RouteStopEntity::delete_many()
                .filter(route_stop::Column::RouteId.eq(existing.route_id))
                .exec(conn)
                .await?;

            let route_id = existing.route_id;
            let mut active: route::ActiveModel = existing.into();
            active.status = Set(RouteStatus::NotStarted);
            active.route_date = Set(date);
            active.start_location_lat = Set(buyer.start_location_lat);
            active.start_location_lng = Set(buyer.start_location_lng);
            active.total_distance_km = Set(Some(
                Decimal::from_f64(schedule.total_distance_km)
                    .unwrap_or_default()
                    .round_dp(2),
            ));
            active.estimated_time_minutes = Set(Some(schedule.total_minutes as i32));
            active.include_return = Set(policy.include_return);
            active.updated_at = Set(Some(now));
            active.update(conn).await?;
            route_id
        }
        None => {
            let active = route::ActiveModel {
                list_id: Set(list.list_id),
                staff_id: Set(staff_id),
                route_date: Set(date),
                status: Set(RouteStatus::NotStarted),
                total_distance_km: Set(Some(
                    Decimal::from_f64(schedule.total_distance_km)
                        .unwrap_or_default()
                        .round_dp(2),
                )),
                estimated_time_minutes: Set(Some(schedule.total_minutes as i32)),
                start_location_lat: Set(buyer.start_location_lat),
                start_location_lng: Set(buyer.start_location_lng),
                include_return: Set(policy.include_return),
                created_at: Set(now),
                updated_at: Set(None),
                ..Default::default()
            };
            active.insert(conn).await?.route_id
        }
    };

    for (idx, stop) in ordered.iter().enumerate() {
        let stop_model = route_stop::ActiveModel {
            route_id: Set(route_id),
            store_id: Set(stop.store_id),
            stop_sequence: Set(idx as i32 + 1),
            estimated_arrival: Set(Some(schedule.arrivals[idx])),
            actual_arrival: Set(None),
            actual_departure: Set(None),
            items_to_purchase: Set(Some(json!(stop.item_ids))),
            items_count: Set(stop.total_quantity as i32),
            status: Set(StopStatus::Pending),
            ..Default::default()
        };
        stop_model.insert(conn).await?;
    }

    let mut list_model: purchase_list::ActiveModel = list.clone().into();
    list_model.status = Set(ListStatus::Assigned);
    list_model.updated_at = Set(Some(now));
    list_model.update(conn).await?;

    // Orders already assigned move to in_progress now that a route exists.
    let list_item_ids: Vec<i32> = tasks.iter().map(|t| t.item_id).collect();
    let order_ids: Vec<i32> = OrderItemEntity::find()
        .filter(order_item::Column::ItemId.is_in(list_item_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|i| i.order_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let owning_orders = OrderEntity::find()
        .filter(order::Column::OrderId.is_in(order_ids))
        .filter(order::Column::Status.eq(OrderStatus::Assigned))
        .all(conn)
        .await?;
    for owning in owning_orders {
        let mut active: order::ActiveModel = owning.into();
        active.status = Set(OrderStatus::InProgress);
        active.updated_at = Set(Some(now));
        active.update(conn).await?;
    }

    info!(
        staff_id,
        %date,
        route_id,
        stops = ordered.len(),
        distance_km = schedule.total_distance_km,
        "route generated"
    );

    Ok(Some(route_id))
}

/// Generate routes for every active buyer holding a non-empty list on the
/// date. Returns the route ids, in staff-id order.
#[instrument(skip(conn, policy))]
pub async fn optimize_all<C: ConnectionTrait>(
    conn: &C,
    policy: &PlanningPolicy,
    office: Coordinates,
    date: NaiveDate,
) -> Result<Vec<i32>, ServiceError> {
    let lists = PurchaseListEntity::find()
        .filter(purchase_list::Column::PurchaseDate.eq(date))
        .filter(purchase_list::Column::TotalItems.gt(0))
        .order_by_asc(purchase_list::Column::StaffId)
        .all(conn)
        .await?;

    let staff_ids: Vec<i32> = lists.iter().map(|l| l.staff_id).collect();
    let buyers: HashSet<i32> = StaffEntity::find()
        .filter(staff::Column::StaffId.is_in(staff_ids))
        .filter(staff::Column::Role.eq(StaffRole::Buyer))
        .filter(staff::Column::IsActive.eq(true))
        .all(conn)
        .await?
        .into_iter()
        .map(|s| s.staff_id)
        .collect();

    let mut route_ids = Vec::new();
    for list in lists {
        if !buyers.contains(&list.staff_id) {
            continue;
        }
        if let Some(route_id) =
            optimize_for_staff(conn, policy, office, list.staff_id, date).await?
        {
            route_ids.push(route_id);
        }
    }
    Ok(route_ids)
}
