pub mod auth;
pub mod common;
pub mod distance_matrix;
pub mod failures;
pub mod health;
pub mod orders;
pub mod plan;
pub mod routes;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    services::{geo::Coordinates, orders::OrderService, planner::PlanningService},
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState.
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub orders: OrderService,
    pub planner: PlanningService,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, events: EventSender, config: &AppConfig) -> Self {
        let office_fallback = Coordinates::from_decimals(
            Some(config.office_lat),
            Some(config.office_lng),
        )
        .expect("configured office coordinates are valid decimals");

        Self {
            orders: OrderService::new(db.clone(), events.clone()),
            planner: PlanningService::new(db, events, office_fallback),
        }
    }
}
