//! End-to-end planning pipeline tests over the SQLite harness: store
//! allocation with quantity splitting, geographic staff assignment, and
//! route generation with schedule simulation.

mod common;

use common::{date, datetime, TestApp};
use dispatch_api::entities::{
    order::{Entity as OrderEntity, OrderStatus},
    order_item::{Entity as OrderItemEntity, ItemStatus},
    product_store_mapping::StockStatus,
    purchase_list::{self, Entity as PurchaseListEntity, ListStatus},
    purchase_list_item::{self, Entity as PurchaseListItemEntity},
    route::{Entity as RouteEntity, RouteStatus},
    route_stop::{self, Entity as RouteStopEntity},
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

const TARGET: &str = "2025-02-04"; // a Tuesday

async fn tasks_for_item(app: &TestApp, item_id: i32) -> Vec<purchase_list_item::Model> {
    PurchaseListItemEntity::find()
        .filter(purchase_list_item::Column::ItemId.eq(item_id))
        .order_by_asc(purchase_list_item::Column::ListItemId)
        .all(&*app.db)
        .await
        .unwrap()
}

#[tokio::test]
async fn quantity_split_fills_stores_by_score() {
    let app = TestApp::new().await;
    app.seed_buyer("Buyer One", 34.70, 135.50, 20).await;

    let store_a = app.seed_store("Store A", Some((34.701, 135.501)), 1, None).await;
    let store_b = app.seed_store("Store B", Some((34.702, 135.502)), 2, None).await;
    let store_c = app.seed_store("Store C", Some((34.703, 135.503)), 2, None).await;

    let product = app.seed_product("SKU-X", "Product X").await;
    app.seed_mapping(product.product_id, store_a.store_id, StockStatus::InStock, None, Some(20))
        .await;
    app.seed_mapping(product.product_id, store_b.store_id, StockStatus::InStock, None, Some(20))
        .await;
    app.seed_mapping(product.product_id, store_c.store_id, StockStatus::LowStock, None, Some(15))
        .await;

    let (order_row, items) = app
        .seed_order(datetime("2025-02-03 09:00"), date(TARGET), &[("SKU-X", 47)])
        .await;

    let summary = app
        .state
        .services
        .planner
        .assign_day(date(TARGET))
        .await
        .unwrap();
    assert_eq!(summary.assigned_count, 1);
    assert_eq!(summary.assigned_tasks, 3);

    let tasks = tasks_for_item(&app, items[0].item_id).await;
    let mut by_store: Vec<(i32, i32)> = tasks
        .iter()
        .map(|t| (t.store_id, t.quantity_to_purchase))
        .collect();
    by_store.sort();
    assert_eq!(
        by_store,
        vec![
            (store_a.store_id, 20),
            (store_b.store_id, 20),
            (store_c.store_id, 7),
        ]
    );

    // Quantity conservation: allocated sums to the requested 47.
    assert_eq!(tasks.iter().map(|t| t.quantity_to_purchase).sum::<i32>(), 47);

    let item = OrderItemEntity::find_by_id(items[0].item_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.status, ItemStatus::Assigned);

    let order_row = OrderEntity::find_by_id(order_row.order_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order_row.status, OrderStatus::Assigned);
}

#[tokio::test]
async fn partial_fulfillment_commits_and_keeps_item_pending() {
    let app = TestApp::new().await;
    app.seed_buyer("Buyer One", 34.70, 135.50, 20).await;

    let store_a = app.seed_store("Store A", Some((34.701, 135.501)), 1, None).await;
    let store_b = app.seed_store("Store B", Some((34.702, 135.502)), 2, None).await;
    let store_c = app.seed_store("Store C", Some((34.703, 135.503)), 2, None).await;

    let product = app.seed_product("SKU-X", "Product X").await;
    for store_id in [store_a.store_id, store_b.store_id, store_c.store_id] {
        app.seed_mapping(product.product_id, store_id, StockStatus::InStock, None, Some(10))
            .await;
    }

    let (order_row, items) = app
        .seed_order(datetime("2025-02-03 09:00"), date(TARGET), &[("SKU-X", 47)])
        .await;

    let summary = app
        .state
        .services
        .planner
        .assign_day(date(TARGET))
        .await
        .unwrap();
    assert_eq!(summary.short_items, 1);
    assert_eq!(summary.assigned_count, 0);

    // The 30 coverable units are committed; the 17-unit remainder stays open.
    let tasks = tasks_for_item(&app, items[0].item_id).await;
    assert_eq!(tasks.iter().map(|t| t.quantity_to_purchase).sum::<i32>(), 30);

    let item = OrderItemEntity::find_by_id(items[0].item_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.status, ItemStatus::Pending);

    let order_row = OrderEntity::find_by_id(order_row.order_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order_row.status, OrderStatus::Pending);
}

#[tokio::test]
async fn geographic_affinity_picks_the_nearer_buyer() {
    let app = TestApp::new().await;
    let near_buyer = app.seed_buyer("Near Buyer", 34.70, 135.50, 20).await;
    let far_buyer = app.seed_buyer("Far Buyer", 34.65, 135.52, 20).await;

    let store_1 = app.seed_store("North", Some((34.706, 135.504)), 1, None).await;
    let store_2 = app.seed_store("Middle", Some((34.705, 135.505)), 1, None).await;
    let store_3 = app.seed_store("South", Some((34.704, 135.506)), 1, None).await;

    let product = app.seed_product("SKU-GEO", "Clustered product").await;
    app.seed_mapping(product.product_id, store_1.store_id, StockStatus::InStock, None, Some(1))
        .await;
    app.seed_mapping(product.product_id, store_2.store_id, StockStatus::InStock, None, Some(1))
        .await;
    app.seed_mapping(product.product_id, store_3.store_id, StockStatus::InStock, None, Some(1))
        .await;

    app.seed_order(datetime("2025-02-03 09:00"), date(TARGET), &[("SKU-GEO", 3)])
        .await;

    app.state
        .services
        .planner
        .assign_day(date(TARGET))
        .await
        .unwrap();

    let near_list = PurchaseListEntity::find()
        .filter(purchase_list::Column::StaffId.eq(near_buyer.staff_id))
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    let far_list = PurchaseListEntity::find()
        .filter(purchase_list::Column::StaffId.eq(far_buyer.staff_id))
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(near_list.total_items, 3);
    assert_eq!(near_list.total_stores, 3);
    assert_eq!(far_list.total_items, 0);
}

#[tokio::test]
async fn store_fixed_products_only_go_to_their_store() {
    let app = TestApp::new().await;
    app.seed_buyer("Buyer One", 34.70, 135.50, 20).await;

    let free_store = app.seed_store("Free", Some((34.701, 135.501)), 1, None).await;
    let fixed_store = app.seed_store("Fixed Only", Some((34.709, 135.509)), 5, None).await;

    let product = app
        .seed_product_full("SKU-FIX", "Fixed product", true, Some(fixed_store.store_id), None)
        .await;
    // A tempting mapping elsewhere must be ignored for a store-fixed product.
    app.seed_mapping(product.product_id, free_store.store_id, StockStatus::InStock, Some(1), None)
        .await;

    let (_, items) = app
        .seed_order(datetime("2025-02-03 09:00"), date(TARGET), &[("SKU-FIX", 5)])
        .await;

    app.state
        .services
        .planner
        .assign_day(date(TARGET))
        .await
        .unwrap();

    let tasks = tasks_for_item(&app, items[0].item_id).await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].store_id, fixed_store.store_id);
    assert_eq!(tasks[0].quantity_to_purchase, 5);
}

#[tokio::test]
async fn capacity_is_respected_and_overflow_items_stay_pending() {
    let app = TestApp::new().await;
    let buyer = app.seed_buyer("Tiny Capacity", 34.70, 135.50, 2).await;

    let store = app.seed_store("Store", Some((34.701, 135.501)), 1, None).await;
    let product = app.seed_product("SKU-CAP", "Capped").await;
    app.seed_mapping(product.product_id, store.store_id, StockStatus::InStock, None, None)
        .await;

    app.seed_order(
        datetime("2025-02-03 09:00"),
        date(TARGET),
        &[("SKU-CAP", 1), ("SKU-CAP", 1), ("SKU-CAP", 1)],
    )
    .await;

    let summary = app
        .state
        .services
        .planner
        .assign_day(date(TARGET))
        .await
        .unwrap();
    assert_eq!(summary.assigned_count, 2);
    assert_eq!(summary.skipped_items, 1);

    let list = PurchaseListEntity::find()
        .filter(purchase_list::Column::StaffId.eq(buyer.staff_id))
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert!(list.total_items <= 2);
}

#[tokio::test]
async fn routes_have_dense_sequences_and_stable_distance() {
    let app = TestApp::new().await;
    let buyer = app.seed_buyer("Router", 34.6937, 135.5023, 20).await;

    // A rough square around the start point.
    let corners = [
        ("NW", 34.70, 135.50),
        ("NE", 34.70, 135.60),
        ("SE", 34.76, 135.60),
        ("SW", 34.76, 135.50),
    ];
    let product = app.seed_product("SKU-SQ", "Square product").await;
    for (name, lat, lng) in corners {
        let store = app.seed_store(name, Some((lat, lng)), 1, None).await;
        app.seed_mapping(product.product_id, store.store_id, StockStatus::InStock, None, Some(1))
            .await;
    }

    app.seed_order(datetime("2025-02-03 09:00"), date(TARGET), &[("SKU-SQ", 4)])
        .await;

    app.state
        .services
        .planner
        .assign_day(date(TARGET))
        .await
        .unwrap();
    let route_ids = app
        .state
        .services
        .planner
        .generate_routes(date(TARGET))
        .await
        .unwrap();
    assert_eq!(route_ids.len(), 1);

    let route_row = RouteEntity::find_by_id(route_ids[0])
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(route_row.staff_id, buyer.staff_id);
    assert_eq!(route_row.status, RouteStatus::NotStarted);
    let first_distance = route_row.total_distance_km.unwrap();
    assert!(first_distance > rust_decimal::Decimal::ZERO);

    let stops = RouteStopEntity::find()
        .filter(route_stop::Column::RouteId.eq(route_ids[0]))
        .order_by_asc(route_stop::Column::StopSequence)
        .all(&*app.db)
        .await
        .unwrap();
    let sequences: Vec<i32> = stops.iter().map(|s| s.stop_sequence).collect();
    assert_eq!(sequences, (1..=stops.len() as i32).collect::<Vec<_>>());

    // Arrivals are strictly ordered along the tour.
    for pair in stops.windows(2) {
        assert!(pair[1].estimated_arrival.unwrap() > pair[0].estimated_arrival.unwrap());
    }

    // Regeneration reuses the route row and the optimized distance is a
    // fixed point of the improvement pass.
    let again = app
        .state
        .services
        .planner
        .generate_routes(date(TARGET))
        .await
        .unwrap();
    assert_eq!(again, route_ids);
    let regenerated = RouteEntity::find_by_id(route_ids[0])
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(regenerated.total_distance_km.unwrap(), first_distance);

    let list = PurchaseListEntity::find()
        .filter(purchase_list::Column::StaffId.eq(buyer.staff_id))
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(list.status, ListStatus::Assigned);
}

#[tokio::test]
async fn schedule_waits_for_late_opening_store() {
    let app = TestApp::new().await;
    app.seed_buyer("Waiter", 34.6937, 135.5023, 20).await;

    // ~12.5 km north: a 30-minute leg from a 10:00 start. Doors open 11:00
    // on Tuesdays, so the buyer waits 30 minutes.
    let store = app
        .seed_store(
            "Late Opener",
            Some((34.8061, 135.5023)),
            1,
            Some(serde_json::json!({"tue": "11:00-20:00"})),
        )
        .await;
    let product = app.seed_product("SKU-WAIT", "Morning stock").await;
    app.seed_mapping(product.product_id, store.store_id, StockStatus::InStock, None, None)
        .await;

    app.seed_order(datetime("2025-02-03 09:00"), date(TARGET), &[("SKU-WAIT", 1)])
        .await;

    app.state
        .services
        .planner
        .assign_day(date(TARGET))
        .await
        .unwrap();
    let route_ids = app
        .state
        .services
        .planner
        .generate_routes(date(TARGET))
        .await
        .unwrap();

    let stops = RouteStopEntity::find()
        .filter(route_stop::Column::RouteId.eq(route_ids[0]))
        .all(&*app.db)
        .await
        .unwrap();
    assert_eq!(
        stops[0].estimated_arrival.unwrap(),
        date(TARGET).and_hms_opt(11, 0, 0).unwrap()
    );

    // 30 travel + 30 wait + (5 + 2×1) shopping.
    let route_row = RouteEntity::find_by_id(route_ids[0])
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(route_row.estimated_time_minutes, Some(67));
}

#[tokio::test]
async fn dispatch_runs_the_full_pipeline_and_starts_routes() {
    let app = TestApp::new().await;
    app.seed_buyer("Dispatcher", 34.70, 135.50, 20).await;

    let store = app.seed_store("Store", Some((34.701, 135.501)), 1, None).await;
    let product = app.seed_product("SKU-D", "Dispatched").await;
    app.seed_mapping(product.product_id, store.store_id, StockStatus::InStock, None, None)
        .await;

    let (order_row, _) = app
        .seed_order(datetime("2025-02-03 09:00"), date(TARGET), &[("SKU-D", 2)])
        .await;

    let summary = app
        .state
        .services
        .planner
        .plan_day(date(TARGET), true)
        .await
        .unwrap();
    assert_eq!(summary.assigned_count, 1);
    assert_eq!(summary.route_ids.len(), 1);
    assert_eq!(summary.routes_started, 1);

    let route_row = RouteEntity::find_by_id(summary.route_ids[0])
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(route_row.status, RouteStatus::InProgress);

    // Orders referenced by the routed list moved to in_progress.
    let order_row = OrderEntity::find_by_id(order_row.order_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order_row.status, OrderStatus::InProgress);
}

#[tokio::test]
async fn plan_day_is_idempotent_for_a_settled_day() {
    let app = TestApp::new().await;
    app.seed_buyer("Stable", 34.70, 135.50, 20).await;

    let store = app.seed_store("Store", Some((34.701, 135.501)), 1, None).await;
    let product = app.seed_product("SKU-I", "Idempotent").await;
    app.seed_mapping(product.product_id, store.store_id, StockStatus::InStock, None, None)
        .await;

    app.seed_order(datetime("2025-02-03 09:00"), date(TARGET), &[("SKU-I", 2)])
        .await;

    let first = app
        .state
        .services
        .planner
        .plan_day(date(TARGET), false)
        .await
        .unwrap();
    let second = app
        .state
        .services
        .planner
        .plan_day(date(TARGET), false)
        .await
        .unwrap();

    // Everything was placed on the first run; the second finds nothing new
    // and regenerates the same route.
    assert_eq!(first.assigned_count, 1);
    assert_eq!(second.assigned_count, 0);
    assert_eq!(second.route_ids, first.route_ids);

    let task_total: i32 = PurchaseListItemEntity::find()
        .all(&*app.db)
        .await
        .unwrap()
        .iter()
        .map(|t| t.quantity_to_purchase)
        .sum();
    assert_eq!(task_total, 2);
}
