use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{NaiveDate, NaiveDateTime};
use migrations::{Migrator, MigratorTrait};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectOptions, Database};
use serde_json::Value;
use tower::ServiceExt;

use dispatch_api::{
    build_router,
    common::jst_now,
    config::AppConfig,
    db::DbPool,
    entities::{
        holiday,
        order::{self, OrderStatus},
        order_item::{self, ItemStatus},
        product,
        product_store_mapping::{self, StockStatus},
        staff::{self, StaffRole, StaffStatus},
        store,
    },
    events::{self, EventSender},
    AppState,
};

/// Test harness: application state over a single-connection in-memory SQLite
/// database with the full migration set applied.
pub struct TestApp {
    pub state: Arc<AppState>,
    pub router: Router,
    pub db: Arc<DbPool>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
        opt.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opt).await.expect("sqlite connection");
        Migrator::up(&db, None).await.expect("migrations apply");
        let db = Arc::new(db);

        let config = AppConfig::new(
            "sqlite::memory:".to_string(),
            "test-secret-key-material-for-integration".to_string(),
        );

        let (event_tx, event_rx) = tokio::sync::mpsc::channel(64);
        tokio::spawn(events::process_events(event_rx));
        let events = EventSender::new(event_tx);

        let state = Arc::new(AppState::new(db.clone(), config, events));
        let router = build_router(state.clone());

        Self { state, router, db }
    }

    pub fn token_for(&self, staff_id: i32, role: StaffRole) -> String {
        self.state
            .auth
            .issue_token(staff_id, role)
            .expect("token issue")
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .expect("request build"),
            None => builder.body(Body::empty()).expect("request build"),
        };

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    pub async fn seed_buyer(
        &self,
        name: &str,
        lat: f64,
        lng: f64,
        capacity: i32,
    ) -> staff::Model {
        self.seed_staff(name, StaffRole::Buyer, Some((lat, lng)), capacity)
            .await
    }

    pub async fn seed_staff(
        &self,
        name: &str,
        role: StaffRole,
        start: Option<(f64, f64)>,
        capacity: i32,
    ) -> staff::Model {
        staff::ActiveModel {
            staff_name: Set(name.to_string()),
            staff_code: Set(None),
            email: Set(format!("{}@example.com", name.to_lowercase().replace(' ', "."))),
            password_hash: Set("unset".to_string()),
            role: Set(role),
            status: Set(StaffStatus::Idle),
            max_daily_capacity: Set(capacity),
            start_location_name: Set(None),
            start_location_lat: Set(start.map(|(lat, _)| decimal(lat))),
            start_location_lng: Set(start.map(|(_, lng)| decimal(lng))),
            is_active: Set(true),
            created_at: Set(jst_now()),
            updated_at: Set(None),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .expect("seed staff")
    }

    pub async fn seed_store(
        &self,
        name: &str,
        coords: Option<(f64, f64)>,
        priority_level: i32,
        opening_hours: Option<Value>,
    ) -> store::Model {
        store::ActiveModel {
            store_name: Set(name.to_string()),
            store_code: Set(None),
            address: Set(None),
            district: Set(None),
            category: Set(None),
            latitude: Set(coords.map(|(lat, _)| decimal(lat))),
            longitude: Set(coords.map(|(_, lng)| decimal(lng))),
            priority_level: Set(priority_level),
            opening_hours: Set(opening_hours),
            is_active: Set(true),
            created_at: Set(jst_now()),
            updated_at: Set(None),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .expect("seed store")
    }

    pub async fn seed_product(&self, sku: &str, name: &str) -> product::Model {
        self.seed_product_full(sku, name, false, None, None).await
    }

    pub async fn seed_product_full(
        &self,
        sku: &str,
        name: &str,
        is_store_fixed: bool,
        fixed_store_id: Option<i32>,
        set_split_rule: Option<Value>,
    ) -> product::Model {
        product::ActiveModel {
            sku: Set(sku.to_string()),
            product_name: Set(name.to_string()),
            category: Set(None),
            is_store_fixed: Set(is_store_fixed),
            fixed_store_id: Set(fixed_store_id),
            exclude_from_routing: Set(false),
            set_split_rule: Set(set_split_rule),
            created_at: Set(jst_now()),
            updated_at: Set(None),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .expect("seed product")
    }

    pub async fn seed_mapping(
        &self,
        product_id: i32,
        store_id: i32,
        stock_status: StockStatus,
        priority: Option<i32>,
        max_daily_quantity: Option<i32>,
    ) -> product_store_mapping::Model {
        product_store_mapping::ActiveModel {
            product_id: Set(product_id),
            store_id: Set(store_id),
            is_primary_store: Set(false),
            priority: Set(priority),
            stock_status: Set(stock_status),
            max_daily_quantity: Set(max_daily_quantity),
            current_available: Set(None),
            updated_at: Set(None),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .expect("seed mapping")
    }

    pub async fn seed_order(
        &self,
        order_date: NaiveDateTime,
        target_date: NaiveDate,
        items: &[(&str, i32)],
    ) -> (order::Model, Vec<order_item::Model>) {
        let order_row = order::ActiveModel {
            external_order_id: Set(None),
            source_channel: Set(Some("test-mall".to_string())),
            customer_name: Set(Some("テスト顧客".to_string())),
            order_date: Set(order_date),
            target_purchase_date: Set(Some(target_date)),
            status: Set(OrderStatus::Pending),
            created_at: Set(jst_now()),
            updated_at: Set(None),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .expect("seed order");

        let mut rows = Vec::new();
        for (sku, quantity) in items {
            let item = order_item::ActiveModel {
                order_id: Set(order_row.order_id),
                sku: Set((*sku).to_string()),
                product_name: Set((*sku).to_string()),
                quantity: Set(*quantity),
                unit_price: Set(None),
                is_bundle: Set(false),
                parent_item_id: Set(None),
                status: Set(ItemStatus::Pending),
                priority: Set("normal".to_string()),
                created_at: Set(jst_now()),
                updated_at: Set(None),
                ..Default::default()
            }
            .insert(&*self.db)
            .await
            .expect("seed order item");
            rows.push(item);
        }

        (order_row, rows)
    }

    pub async fn seed_holiday(&self, date: NaiveDate, is_working: bool) -> holiday::Model {
        holiday::ActiveModel {
            holiday_date: Set(date),
            holiday_name: Set(Some("テスト祝日".to_string())),
            is_working: Set(is_working),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .expect("seed holiday")
    }
}

pub fn decimal(value: f64) -> Decimal {
    use rust_decimal::prelude::FromPrimitive;
    Decimal::from_f64(value).expect("finite decimal")
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("test date")
}

pub fn datetime(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").expect("test datetime")
}

pub async fn response_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}
