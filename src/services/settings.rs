use chrono::NaiveTime;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::{
    entities::business_rule::{self, Entity as BusinessRuleEntity},
    errors::ServiceError,
    services::geo::Coordinates,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationPriority {
    Speed,
    Distance,
    Balanced,
}

/// Office / default start point as configured in business rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartLocation {
    pub label: String,
    pub lat: Decimal,
    pub lng: Decimal,
}

/// Snapshot of the policy records a planning run operates under. Loaded once
/// at transaction start; never read again mid-plan.
#[derive(Debug, Clone)]
pub struct PlanningPolicy {
    pub cutoff_time: NaiveTime,
    pub weekend_processing: bool,
    pub holiday_override: bool,
    pub default_start_location: Option<StartLocation>,
    pub max_orders_per_staff: i32,
    pub auto_assign: bool,
    pub optimization_priority: OptimizationPriority,
    pub max_route_time_hours: i32,
    pub include_return: bool,
}

impl Default for PlanningPolicy {
    fn default() -> Self {
        Self {
            cutoff_time: NaiveTime::from_hms_opt(13, 10, 0).expect("valid cutoff default"),
            weekend_processing: false,
            holiday_override: false,
            default_start_location: None,
            max_orders_per_staff: 20,
            auto_assign: true,
            optimization_priority: OptimizationPriority::Speed,
            max_route_time_hours: 4,
            include_return: false,
        }
    }
}

impl PlanningPolicy {
    /// Load active business rules. Unknown keys are ignored; malformed values
    /// fall back to the defaults rather than failing the plan.
    pub async fn load<C: ConnectionTrait>(conn: &C) -> Result<Self, ServiceError> {
        let rules = BusinessRuleEntity::find()
            .filter(business_rule::Column::IsActive.eq(true))
            .all(conn)
            .await?;

        let by_key: HashMap<String, Value> = rules
            .into_iter()
            .map(|r| (r.rule_key, r.rule_value))
            .collect();

        let mut policy = Self::default();

        if let Some(v) = by_key.get("cutoff_time").and_then(Value::as_str) {
            if let Ok(t) = NaiveTime::parse_from_str(&format!("{v}:00"), "%H:%M:%S") {
                policy.cutoff_time = t;
            } else if let Ok(t) = NaiveTime::parse_from_str(v, "%H:%M:%S") {
                policy.cutoff_time = t;
            }
        }
        if let Some(v) = by_key.get("weekend_processing").and_then(Value::as_bool) {
            policy.weekend_processing = v;
        }
        if let Some(v) = by_key.get("holiday_override").and_then(Value::as_bool) {
            policy.holiday_override = v;
        }
        if let Some(v) = by_key.get("default_start_location") {
            if let Ok(loc) = serde_json::from_value::<StartLocation>(v.clone()) {
                policy.default_start_location = Some(loc);
            }
        }
        if let Some(v) = by_key.get("max_orders_per_staff").and_then(Value::as_i64) {
            if v > 0 {
                policy.max_orders_per_staff = v as i32;
            }
        }
        if let Some(v) = by_key.get("auto_assign").and_then(Value::as_bool) {
            policy.auto_assign = v;
        }
        if let Some(v) = by_key.get("optimization_priority") {
            if let Ok(p) = serde_json::from_value::<OptimizationPriority>(v.clone()) {
                policy.optimization_priority = p;
            }
        }
        if let Some(v) = by_key.get("max_route_time_hours").and_then(Value::as_i64) {
            if v > 0 {
                policy.max_route_time_hours = v as i32;
            }
        }
        if let Some(v) = by_key.get("include_return").and_then(Value::as_bool) {
            policy.include_return = v;
        }

        Ok(policy)
    }

    /// The configured office start point, if the rule is present and geocoded.
    pub fn office(&self) -> Option<Coordinates> {
        self.default_start_location
            .as_ref()
            .and_then(|loc| Coordinates::from_decimals(Some(loc.lat), Some(loc.lng)))
    }
}
