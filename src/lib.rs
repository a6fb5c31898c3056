pub mod auth;
pub mod common;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod services;

use std::sync::Arc;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth::AuthService, config::AppConfig, db::DbPool, events::EventSender};

/// Application state shared with every handler.
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: AppConfig,
    pub auth: Arc<AuthService>,
    pub events: EventSender,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(db: Arc<DbPool>, config: AppConfig, events: EventSender) -> Self {
        let auth = Arc::new(AuthService::new(
            &config.jwt_secret,
            config.jwt_expiration_secs,
        ));
        let services = handlers::AppServices::new(db.clone(), events.clone(), &config);
        Self {
            db,
            config,
            auth,
            events,
            services,
        }
    }
}

/// Assemble the HTTP surface. Shared by `main` and the test harness.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/health", handlers::health::health_routes())
        .nest(
            "/api/v1",
            Router::new()
                .nest("/auth", handlers::auth::auth_routes())
                .nest("/orders", handlers::orders::orders_routes())
                .nest("/plan", handlers::plan::plan_routes())
                .nest("/routes", handlers::routes::routes_routes())
                .nest("/failures", handlers::failures::failure_routes())
                .nest(
                    "/distance-matrix",
                    handlers::distance_matrix::distance_matrix_routes(),
                ),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
