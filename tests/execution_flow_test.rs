//! Execution-tracking tests: the stop-completion cascade, the authorization
//! matrix on stop updates, and the failure recording channel.

mod common;

use axum::http::{Method, StatusCode};
use common::{assert_status, date, datetime, response_json, TestApp};
use dispatch_api::entities::{
    order::{Entity as OrderEntity, OrderStatus},
    order_item::{self, Entity as OrderItemEntity, ItemStatus},
    product_store_mapping::StockStatus,
    purchase_list::{Entity as PurchaseListEntity, ListStatus},
    purchase_list_item::{self, Entity as PurchaseListItemEntity, PurchaseStatus},
    route::{Entity as RouteEntity, RouteStatus},
    route_stop::{self, Entity as RouteStopEntity},
    staff::StaffRole,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde_json::json;

const TARGET: &str = "2025-02-04";

struct ExecutionFixture {
    app: TestApp,
    buyer_id: i32,
    order_id: i32,
    route_id: i32,
    stop_ids: Vec<i32>,
}

/// One buyer, two stores, a four-item order split two items per store, with
/// the route already generated.
async fn fixture() -> ExecutionFixture {
    let app = TestApp::new().await;
    let buyer = app.seed_buyer("Runner", 34.70, 135.50, 20).await;

    let store_1 = app.seed_store("East", Some((34.701, 135.501)), 1, None).await;
    let store_2 = app.seed_store("West", Some((34.702, 135.502)), 1, None).await;

    for (sku, store_id) in [
        ("SKU-1", store_1.store_id),
        ("SKU-2", store_1.store_id),
        ("SKU-3", store_2.store_id),
        ("SKU-4", store_2.store_id),
    ] {
        let product = app.seed_product(sku, sku).await;
        app.seed_mapping(product.product_id, store_id, StockStatus::InStock, None, None)
            .await;
    }

    let (order_row, _) = app
        .seed_order(
            datetime("2025-02-03 09:00"),
            date(TARGET),
            &[("SKU-1", 1), ("SKU-2", 1), ("SKU-3", 1), ("SKU-4", 1)],
        )
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
        .order_by_asc(route_stop::Column::StopSequence)
        .all(&*app.db)
        .await
        .unwrap();

    ExecutionFixture {
        buyer_id: buyer.staff_id,
        order_id: order_row.order_id,
        route_id: route_ids[0],
        stop_ids: stops.iter().map(|s| s.stop_id).collect(),
        app,
    }
}

#[tokio::test]
async fn completing_all_stops_cascades_to_items_order_and_route() {
    let fx = fixture().await;
    let token = fx.app.token_for(fx.buyer_id, StaffRole::Buyer);

    // First stop done: its items are purchased, the order is partial.
    let response = fx
        .app
        .request(
            Method::PATCH,
            &format!("/api/v1/routes/{}/stops/{}", fx.route_id, fx.stop_ids[0]),
            Some(&token),
            Some(json!({ "stop_status": "completed" })),
        )
        .await;
    assert_status(&response, StatusCode::OK);

    let order_row = OrderEntity::find_by_id(fx.order_id)
        .one(&*fx.app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order_row.status, OrderStatus::PartiallyCompleted);

    let route_row = RouteEntity::find_by_id(fx.route_id)
        .one(&*fx.app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(route_row.status, RouteStatus::InProgress);

    // Second stop done: everything completes.
    let response = fx
        .app
        .request(
            Method::PATCH,
            &format!("/api/v1/routes/{}/stops/{}", fx.route_id, fx.stop_ids[1]),
            Some(&token),
            Some(json!({ "stop_status": "completed" })),
        )
        .await;
    assert_status(&response, StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["route_completed"], json!(true));

    let items = OrderItemEntity::find()
        .filter(order_item::Column::OrderId.eq(fx.order_id))
        .all(&*fx.app.db)
        .await
        .unwrap();
    assert_eq!(items.len(), 4);
    assert!(items.iter().all(|i| i.status == ItemStatus::Purchased));

    let order_row = OrderEntity::find_by_id(fx.order_id)
        .one(&*fx.app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order_row.status, OrderStatus::Completed);

    let route_row = RouteEntity::find_by_id(fx.route_id)
        .one(&*fx.app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(route_row.status, RouteStatus::Completed);

    let list = PurchaseListEntity::find_by_id(route_row.list_id)
        .one(&*fx.app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(list.status, ListStatus::Completed);
}

#[tokio::test]
async fn completing_a_stop_twice_does_not_double_cascade() {
    let fx = fixture().await;
    let token = fx.app.token_for(fx.buyer_id, StaffRole::Buyer);
    let uri = format!("/api/v1/routes/{}/stops/{}", fx.route_id, fx.stop_ids[0]);

    for _ in 0..2 {
        let response = fx
            .app
            .request(
                Method::PATCH,
                &uri,
                Some(&token),
                Some(json!({ "stop_status": "completed" })),
            )
            .await;
        assert_status(&response, StatusCode::OK);
    }

    let order_row = OrderEntity::find_by_id(fx.order_id)
        .one(&*fx.app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order_row.status, OrderStatus::PartiallyCompleted);
}

#[tokio::test]
async fn only_the_assigned_buyer_or_supervisor_may_update_stops() {
    let fx = fixture().await;
    let other_buyer = fx.app.seed_buyer("Bystander", 34.60, 135.40, 20).await;
    let supervisor = fx
        .app
        .seed_staff("Floor Lead", StaffRole::Supervisor, None, 0)
        .await;

    let uri = format!("/api/v1/routes/{}/stops/{}", fx.route_id, fx.stop_ids[0]);

    // No token at all.
    let response = fx.app.request(Method::PATCH, &uri, None, Some(json!({
        "stop_status": "current"
    }))).await;
    assert_status(&response, StatusCode::UNAUTHORIZED);

    // A different buyer.
    let other_token = fx.app.token_for(other_buyer.staff_id, StaffRole::Buyer);
    let response = fx
        .app
        .request(
            Method::PATCH,
            &uri,
            Some(&other_token),
            Some(json!({ "stop_status": "current" })),
        )
        .await;
    assert_status(&response, StatusCode::FORBIDDEN);

    // A supervisor may.
    let supervisor_token = fx
        .app
        .token_for(supervisor.staff_id, StaffRole::Supervisor);
    let response = fx
        .app
        .request(
            Method::PATCH,
            &uri,
            Some(&supervisor_token),
            Some(json!({ "stop_status": "current" })),
        )
        .await;
    assert_status(&response, StatusCode::OK);
}

#[tokio::test]
async fn unknown_stop_or_route_is_not_found() {
    let fx = fixture().await;
    let token = fx.app.token_for(fx.buyer_id, StaffRole::Buyer);

    let response = fx
        .app
        .request(
            Method::PATCH,
            &format!("/api/v1/routes/{}/stops/99999", fx.route_id),
            Some(&token),
            Some(json!({ "stop_status": "completed" })),
        )
        .await;
    assert_status(&response, StatusCode::NOT_FOUND);

    let response = fx
        .app
        .request(
            Method::PATCH,
            "/api/v1/routes/99999/stops/1",
            Some(&token),
            Some(json!({ "stop_status": "completed" })),
        )
        .await;
    assert_status(&response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn recording_a_failure_flips_task_and_item() {
    let fx = fixture().await;
    let token = fx.app.token_for(fx.buyer_id, StaffRole::Buyer);

    let task = PurchaseListItemEntity::find()
        .all(&*fx.app.db)
        .await
        .unwrap()
        .into_iter()
        .next()
        .unwrap();

    let response = fx
        .app
        .request(
            Method::POST,
            "/api/v1/failures",
            Some(&token),
            Some(json!({
                "list_item_id": task.list_item_id,
                "item_id": task.item_id,
                "store_id": task.store_id,
                "failure_type": "out_of_stock",
                "notes": "棚が空でした"
            })),
        )
        .await;
    assert_status(&response, StatusCode::CREATED);
    let body = response_json(response).await;
    assert!(body["failure_id"].as_i64().unwrap() > 0);

    let task = PurchaseListItemEntity::find_by_id(task.list_item_id)
        .one(&*fx.app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(task.status, PurchaseStatus::Failed);
    assert_eq!(task.failure_reason.as_deref(), Some("out_of_stock"));

    let item = OrderItemEntity::find_by_id(task.item_id)
        .one(&*fx.app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.status, ItemStatus::Failed);

    // Failures are observations; nothing is re-allocated.
    let tasks = PurchaseListItemEntity::find()
        .filter(purchase_list_item::Column::ItemId.eq(task.item_id))
        .all(&*fx.app.db)
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);
}
