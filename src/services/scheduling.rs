use std::collections::HashMap;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Weekday};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::{
    common::jst_now,
    entities::{
        holiday::{self, Entity as HolidayEntity},
        order_item::{self, Entity as OrderItemEntity, ItemStatus},
        product::{self, Entity as ProductEntity},
    },
    errors::ServiceError,
    services::settings::PlanningPolicy,
};

/// Upper bound on the business-day search. Exceeding it means the weekend /
/// holiday configuration can never resolve and is treated as a policy error.
const MAX_CUTOFF_ITERATIONS: u32 = 30;

/// Map an order arrival to its target business day.
///
/// Before the cutoff time the order ships the same day; after it, the next
/// day. The candidate then advances past weekends (unless weekend processing
/// is on) and non-working holidays. A holiday is accepted when the global
/// override is set or the holiday itself is flagged working.
pub fn resolve_target_date(
    arrival: NaiveDateTime,
    policy: &PlanningPolicy,
    holidays: &HashMap<NaiveDate, bool>,
) -> Result<NaiveDate, ServiceError> {
    let mut candidate = if arrival.time() < policy.cutoff_time {
        arrival.date()
    } else {
        arrival
            .date()
            .checked_add_days(Days::new(1))
            .ok_or_else(|| ServiceError::PolicyError("arrival date out of range".to_string()))?
    };

    for _ in 0..MAX_CUTOFF_ITERATIONS {
        if !policy.weekend_processing
            && matches!(candidate.weekday(), Weekday::Sat | Weekday::Sun)
        {
            candidate = candidate
                .checked_add_days(Days::new(1))
                .ok_or_else(|| ServiceError::PolicyError("date overflow".to_string()))?;
            continue;
        }

        if let Some(&is_working) = holidays.get(&candidate) {
            if policy.holiday_override || is_working {
                return Ok(candidate);
            }
            candidate = candidate
                .checked_add_days(Days::new(1))
                .ok_or_else(|| ServiceError::PolicyError("date overflow".to_string()))?;
            continue;
        }

        return Ok(candidate);
    }

    warn!(%arrival, "cutoff search exhausted after {MAX_CUTOFF_ITERATIONS} iterations");
    Err(ServiceError::PolicyError(format!(
        "営業日を{MAX_CUTOFF_ITERATIONS}日以内に決定できません。休日設定を確認してください"
    )))
}

/// Load the holiday window relevant to one cutoff resolution.
async fn holiday_window<C: ConnectionTrait>(
    conn: &C,
    from: NaiveDate,
) -> Result<HashMap<NaiveDate, bool>, ServiceError> {
    let until = from
        .checked_add_days(Days::new(u64::from(MAX_CUTOFF_ITERATIONS) + 1))
        .ok_or_else(|| ServiceError::PolicyError("date overflow".to_string()))?;

    let holidays = HolidayEntity::find()
        .filter(holiday::Column::HolidayDate.between(from, until))
        .all(conn)
        .await?;

    Ok(holidays
        .into_iter()
        .map(|h| (h.holiday_date, h.is_working))
        .collect())
}

/// Resolve a target purchase date against the live policy and calendar.
#[instrument(skip(conn))]
pub async fn target_purchase_date<C: ConnectionTrait>(
    conn: &C,
    arrival: NaiveDateTime,
) -> Result<NaiveDate, ServiceError> {
    let policy = PlanningPolicy::load(conn).await?;
    let holidays = holiday_window(conn, arrival.date()).await?;
    resolve_target_date(arrival, &policy, &holidays)
}

#[derive(Debug, Deserialize)]
struct SplitRule {
    #[serde(default)]
    items: Vec<SplitRuleItem>,
}

#[derive(Debug, Deserialize)]
struct SplitRuleItem {
    sku: String,
    qty: i32,
}

/// Expand bundle lines of an order into atomic child items.
///
/// Children carry `qty_per_bundle × bundle.quantity` and link back through
/// `parent_item_id`; the bundle itself is marked assigned so it never enters
/// planning. Returns the number of child items created.
#[instrument(skip(conn))]
pub async fn expand_bundles<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
) -> Result<u64, ServiceError> {
    let bundles = OrderItemEntity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .filter(order_item::Column::IsBundle.eq(true))
        .filter(order_item::Column::Status.eq(ItemStatus::Pending))
        .all(conn)
        .await?;

    if bundles.is_empty() {
        return Ok(0);
    }

    let skus: Vec<String> = bundles.iter().map(|b| b.sku.clone()).collect();
    let products = ProductEntity::find()
        .filter(product::Column::Sku.is_in(skus))
        .all(conn)
        .await?;
    let products_by_sku: HashMap<&str, &product::Model> =
        products.iter().map(|p| (p.sku.as_str(), p)).collect();

    let now = jst_now();
    let mut created = 0u64;

    for bundle in &bundles {
        let rule = products_by_sku
            .get(bundle.sku.as_str())
            .and_then(|p| p.set_split_rule.clone())
            .and_then(|json| serde_json::from_value::<SplitRule>(json).ok());

        if let Some(rule) = rule {
            for child in &rule.items {
                let child_model = order_item::ActiveModel {
                    order_id: Set(order_id),
                    sku: Set(child.sku.clone()),
                    product_name: Set(format!("{} - {}", bundle.product_name, child.sku)),
                    quantity: Set(child.qty * bundle.quantity),
                    unit_price: Set(None),
                    is_bundle: Set(false),
                    parent_item_id: Set(Some(bundle.item_id)),
                    status: Set(ItemStatus::Pending),
                    priority: Set(bundle.priority.clone()),
                    created_at: Set(now),
                    updated_at: Set(None),
                    ..Default::default()
                };
                child_model.insert(conn).await?;
                created += 1;
            }
        } else {
            warn!(sku = %bundle.sku, item_id = bundle.item_id, "bundle without split rule");
        }

        let mut bundle_model: order_item::ActiveModel = bundle.clone().into();
        bundle_model.status = Set(ItemStatus::Assigned);
        bundle_model.updated_at = Set(Some(now));
        bundle_model.update(conn).await?;
    }

    if created > 0 {
        info!(order_id, created, "expanded bundle items");
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn policy() -> PlanningPolicy {
        PlanningPolicy::default()
    }

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M")
            .expect("valid test timestamp")
    }

    fn day(date: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("valid test date")
    }

    #[test]
    fn arrival_before_cutoff_ships_same_day() {
        // Tuesday 11:30, cutoff 13:10.
        let target =
            resolve_target_date(at("2025-02-04", "11:30"), &policy(), &HashMap::new()).unwrap();
        assert_eq!(target, day("2025-02-04"));
    }

    #[test]
    fn arrival_after_cutoff_on_friday_skips_weekend() {
        let target =
            resolve_target_date(at("2025-02-07", "14:00"), &policy(), &HashMap::new()).unwrap();
        assert_eq!(target, day("2025-02-10"));
    }

    #[test]
    fn arrival_exactly_at_cutoff_ships_next_day() {
        let target =
            resolve_target_date(at("2025-02-04", "13:10"), &policy(), &HashMap::new()).unwrap();
        assert_eq!(target, day("2025-02-05"));
    }

    #[test]
    fn weekend_processing_keeps_saturday() {
        let mut p = policy();
        p.weekend_processing = true;
        let target =
            resolve_target_date(at("2025-02-07", "14:00"), &p, &HashMap::new()).unwrap();
        assert_eq!(target, day("2025-02-08"));
    }

    #[test]
    fn non_working_holiday_is_skipped() {
        let holidays = HashMap::from([(day("2025-02-05"), false)]);
        let target = resolve_target_date(at("2025-02-04", "14:00"), &policy(), &holidays).unwrap();
        assert_eq!(target, day("2025-02-06"));
    }

    #[test]
    fn working_holiday_is_accepted() {
        let holidays = HashMap::from([(day("2025-02-05"), true)]);
        let target = resolve_target_date(at("2025-02-04", "14:00"), &policy(), &holidays).unwrap();
        assert_eq!(target, day("2025-02-05"));
    }

    #[test]
    fn holiday_override_accepts_any_holiday() {
        let mut p = policy();
        p.holiday_override = true;
        let holidays = HashMap::from([(day("2025-02-05"), false)]);
        let target = resolve_target_date(at("2025-02-04", "14:00"), &p, &holidays).unwrap();
        assert_eq!(target, day("2025-02-05"));
    }

    #[test]
    fn endless_holidays_raise_policy_error() {
        let start = day("2025-02-05");
        let holidays: HashMap<NaiveDate, bool> = (0..60)
            .map(|i| (start.checked_add_days(Days::new(i)).unwrap(), false))
            .collect();
        let result = resolve_target_date(at("2025-02-04", "14:00"), &policy(), &holidays);
        assert!(matches!(result, Err(ServiceError::PolicyError(_))));
    }

    #[test]
    fn resolution_is_a_pure_function_of_inputs() {
        let arrival = at("2025-02-07", "14:00");
        let first = resolve_target_date(arrival, &policy(), &HashMap::new()).unwrap();
        let second = resolve_target_date(arrival, &policy(), &HashMap::new()).unwrap();
        assert_eq!(first, second);
    }
}
