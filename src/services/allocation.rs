use std::collections::HashMap;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::{
    entities::{
        order_item,
        product::{self, Entity as ProductEntity},
        product_store_mapping::{self, Entity as MappingEntity, StockStatus},
        store::{self, Entity as StoreEntity},
    },
    errors::ServiceError,
    services::geo::{self, Coordinates},
};

/// A (store, quantity) contribution toward an item's requested quantity.
#[derive(Debug, Clone, Serialize)]
pub struct StoreAllocation {
    pub store_id: i32,
    pub store_name: String,
    pub quantity: i32,
    pub score: f64,
}

/// All store allocations for one order item. `remaining_quantity` is the
/// part that could not be placed; callers treat it as partial fulfillment.
#[derive(Debug, Clone, Serialize)]
pub struct ItemAllocation {
    pub item_id: i32,
    pub sku: String,
    pub total_quantity: i32,
    pub allocations: Vec<StoreAllocation>,
    pub remaining_quantity: i32,
}

impl ItemAllocation {
    fn unfulfilled(item: &order_item::Model) -> Self {
        Self {
            item_id: item.item_id,
            sku: item.sku.clone(),
            total_quantity: item.quantity,
            allocations: Vec::new(),
            remaining_quantity: item.quantity,
        }
    }

    pub fn allocated_quantity(&self) -> i32 {
        self.allocations.iter().map(|a| a.quantity).sum()
    }

    pub fn store_ids(&self) -> Vec<i32> {
        self.allocations.iter().map(|a| a.store_id).collect()
    }
}

/// Score one (mapping, store) candidate.
///
/// Weights: stock status (in 100 / low 50 / unknown 25), store priority level
/// and mapping priority (1 = best), primary-store bonus, and proximity to the
/// buyer's start point when allocating for a specific buyer.
pub fn score_candidate(
    mapping: &product_store_mapping::Model,
    store: &store::Model,
    staff_location: Option<Coordinates>,
) -> f64 {
    let mut score = 0.0;

    score += match mapping.stock_status {
        StockStatus::InStock => 100.0,
        StockStatus::LowStock => 50.0,
        StockStatus::Unknown => 25.0,
        StockStatus::OutOfStock | StockStatus::Discontinued => 0.0,
    };

    score += f64::from((10 - store.priority_level).max(0)) * 5.0;

    if let Some(priority) = mapping.priority {
        score += f64::from((10 - priority).max(0)) * 3.0;
    }

    if mapping.is_primary_store {
        score += 20.0;
    }

    if let (Some(staff), Some(store_pos)) = (
        staff_location,
        Coordinates::from_decimals(store.latitude, store.longitude),
    ) {
        let distance = geo::haversine_km(staff, store_pos);
        score += if distance < 1.0 {
            50.0
        } else if distance < 3.0 {
            30.0
        } else if distance < 5.0 {
            15.0
        } else if distance < 10.0 {
            5.0
        } else {
            0.0
        };
    }

    score
}

/// Single-day cap a store can contribute for a product. `None` means
/// unbounded; out-of-stock and discontinued mappings contribute nothing.
pub fn available_quantity(mapping: &product_store_mapping::Model) -> Option<i32> {
    if let Some(current) = mapping.current_available {
        return Some(current);
    }
    if let Some(max_daily) = mapping.max_daily_quantity {
        return Some(max_daily);
    }
    if matches!(
        mapping.stock_status,
        StockStatus::OutOfStock | StockStatus::Discontinued
    ) {
        return Some(0);
    }
    None
}

struct ScoredCandidate<'a> {
    store_id: i32,
    store_name: &'a str,
    score: f64,
    available: Option<i32>,
}

/// Greedy split of `requested` across scored candidates, highest score first.
fn split_quantity(requested: i32, candidates: &[ScoredCandidate<'_>]) -> (Vec<StoreAllocation>, i32) {
    let mut remaining = requested;
    let mut allocations = Vec::new();

    for candidate in candidates {
        if remaining <= 0 {
            break;
        }
        let to_buy = match candidate.available {
            Some(cap) => remaining.min(cap),
            None => remaining,
        };
        if to_buy > 0 {
            allocations.push(StoreAllocation {
                store_id: candidate.store_id,
                store_name: candidate.store_name.to_string(),
                quantity: to_buy,
                score: candidate.score,
            });
            remaining -= to_buy;
        }
    }

    (allocations, remaining)
}

/// Allocate the requested quantity of every item across candidate stores.
///
/// Exactly two master bulk reads (products by SKU set, mappings+stores by
/// product-id set) plus one store lookup for fixed-store products; never a
/// per-item query. For every result, allocated + remaining equals the item
/// quantity. Items with no product row come back fully unfulfilled.
#[instrument(skip(conn, items), fields(item_count = items.len()))]
pub async fn allocate<C: ConnectionTrait>(
    conn: &C,
    items: &[order_item::Model],
    staff_location: Option<Coordinates>,
) -> Result<HashMap<i32, ItemAllocation>, ServiceError> {
    let mut result = HashMap::new();
    if items.is_empty() {
        return Ok(result);
    }

    let skus: Vec<String> = items.iter().map(|i| i.sku.clone()).collect();
    let products = ProductEntity::find()
        .filter(product::Column::Sku.is_in(skus))
        .all(conn)
        .await?;
    let products_by_sku: HashMap<&str, &product::Model> =
        products.iter().map(|p| (p.sku.as_str(), p)).collect();

    let product_ids: Vec<i32> = products.iter().map(|p| p.product_id).collect();
    let mapping_rows: Vec<(product_store_mapping::Model, Option<store::Model>)> =
        if product_ids.is_empty() {
            Vec::new()
        } else {
            MappingEntity::find()
                .find_also_related(StoreEntity)
                .filter(product_store_mapping::Column::ProductId.is_in(product_ids))
                .filter(store::Column::IsActive.eq(true))
                .all(conn)
                .await?
        };

    let mut mappings_by_product: HashMap<i32, Vec<(product_store_mapping::Model, store::Model)>> =
        HashMap::new();
    for (mapping, maybe_store) in mapping_rows {
        if let Some(store) = maybe_store {
            mappings_by_product
                .entry(mapping.product_id)
                .or_default()
                .push((mapping, store));
        }
    }

    // Fixed-store products bypass scoring; fetch their stores in one go.
    let fixed_store_ids: Vec<i32> = products
        .iter()
        .filter(|p| p.is_store_fixed)
        .filter_map(|p| p.fixed_store_id)
        .collect();
    let fixed_stores: HashMap<i32, store::Model> = if fixed_store_ids.is_empty() {
        HashMap::new()
    } else {
        StoreEntity::find()
            .filter(store::Column::StoreId.is_in(fixed_store_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|s| (s.store_id, s))
            .collect()
    };

    for item in items {
        let Some(product) = products_by_sku.get(item.sku.as_str()) else {
            debug!(sku = %item.sku, item_id = item.item_id, "no product row for SKU");
            result.insert(item.item_id, ItemAllocation::unfulfilled(item));
            continue;
        };

        if product.is_store_fixed {
            if let Some(fixed_store_id) = product.fixed_store_id {
                let store_name = fixed_stores
                    .get(&fixed_store_id)
                    .map(|s| s.store_name.clone())
                    .unwrap_or_else(|| "Unknown".to_string());
                result.insert(
                    item.item_id,
                    ItemAllocation {
                        item_id: item.item_id,
                        sku: item.sku.clone(),
                        total_quantity: item.quantity,
                        allocations: vec![StoreAllocation {
                            store_id: fixed_store_id,
                            store_name,
                            quantity: item.quantity,
                            score: 100.0,
                        }],
                        remaining_quantity: 0,
                    },
                );
                continue;
            }
        }

        let Some(candidates) = mappings_by_product.get(&product.product_id) else {
            result.insert(item.item_id, ItemAllocation::unfulfilled(item));
            continue;
        };

        let mut scored: Vec<ScoredCandidate<'_>> = candidates
            .iter()
            .map(|(mapping, store)| ScoredCandidate {
                store_id: store.store_id,
                store_name: store.store_name.as_str(),
                score: score_candidate(mapping, store, staff_location),
                available: available_quantity(mapping),
            })
            .collect();
        // Descending score; equal scores resolve by lower store id so the
        // plan is deterministic.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.store_id.cmp(&b.store_id))
        });

        let (allocations, remaining) = split_quantity(item.quantity, &scored);
        result.insert(
            item.item_id,
            ItemAllocation {
                item_id: item.item_id,
                sku: item.sku.clone(),
                total_quantity: item.quantity,
                allocations,
                remaining_quantity: remaining,
            },
        );
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn mapping(
        store_id: i32,
        stock_status: StockStatus,
        priority: Option<i32>,
        max_daily: Option<i32>,
    ) -> product_store_mapping::Model {
        product_store_mapping::Model {
            mapping_id: store_id,
            product_id: 1,
            store_id,
            is_primary_store: false,
            priority,
            stock_status,
            max_daily_quantity: max_daily,
            current_available: None,
            updated_at: None,
        }
    }

    fn store_at(store_id: i32, priority_level: i32) -> store::Model {
        store::Model {
            store_id,
            store_name: format!("Store {store_id}"),
            store_code: None,
            address: None,
            district: None,
            category: None,
            latitude: Some(dec!(34.70)),
            longitude: Some(dec!(135.50)),
            priority_level,
            opening_hours: None,
            is_active: true,
            created_at: NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            updated_at: None,
        }
    }

    #[test]
    fn stock_status_dominates_the_score() {
        let store = store_at(1, 5);
        let in_stock = score_candidate(&mapping(1, StockStatus::InStock, None, None), &store, None);
        let low = score_candidate(&mapping(1, StockStatus::LowStock, None, None), &store, None);
        let unknown = score_candidate(&mapping(1, StockStatus::Unknown, None, None), &store, None);
        let out = score_candidate(&mapping(1, StockStatus::OutOfStock, None, None), &store, None);
        assert!(in_stock > low && low > unknown && unknown > out);
        assert_eq!(in_stock - low, 50.0);
    }

    #[test]
    fn primary_store_flag_adds_twenty() {
        let store = store_at(1, 5);
        let mut m = mapping(1, StockStatus::InStock, None, None);
        let base = score_candidate(&m, &store, None);
        m.is_primary_store = true;
        assert_eq!(score_candidate(&m, &store, None), base + 20.0);
    }

    #[test]
    fn nearby_store_gets_distance_bonus() {
        let store = store_at(1, 5);
        let m = mapping(1, StockStatus::InStock, None, None);
        let far = score_candidate(&m, &store, Some(Coordinates::new(35.7, 139.7)));
        let near = score_candidate(&m, &store, Some(Coordinates::new(34.70, 135.50)));
        assert_eq!(near - far, 50.0);
    }

    #[test]
    fn current_available_takes_precedence_over_max_daily() {
        let mut m = mapping(1, StockStatus::InStock, None, Some(30));
        m.current_available = Some(4);
        assert_eq!(available_quantity(&m), Some(4));
    }

    #[test]
    fn out_of_stock_without_counters_caps_at_zero() {
        let m = mapping(1, StockStatus::OutOfStock, None, None);
        assert_eq!(available_quantity(&m), Some(0));
    }

    #[test]
    fn unknown_stock_without_counters_is_unbounded() {
        let m = mapping(1, StockStatus::Unknown, None, None);
        assert_eq!(available_quantity(&m), None);
    }

    // The S3 shape: 47 units over caps 20/20/15 fills in priority order.
    #[test]
    fn split_fills_stores_in_score_order() {
        let candidates = vec![
            ScoredCandidate {
                store_id: 1,
                store_name: "A",
                score: 170.0,
                available: Some(20),
            },
            ScoredCandidate {
                store_id: 2,
                store_name: "B",
                score: 160.0,
                available: Some(20),
            },
            ScoredCandidate {
                store_id: 3,
                store_name: "C",
                score: 110.0,
                available: Some(15),
            },
        ];
        let (allocations, remaining) = split_quantity(47, &candidates);
        let quantities: Vec<i32> = allocations.iter().map(|a| a.quantity).collect();
        assert_eq!(quantities, vec![20, 20, 7]);
        assert_eq!(remaining, 0);
    }

    // The S4 shape: caps 10/10/10 leave a reported remainder of 17.
    #[test]
    fn split_reports_unfulfillable_remainder() {
        let candidates = vec![
            ScoredCandidate {
                store_id: 1,
                store_name: "A",
                score: 170.0,
                available: Some(10),
            },
            ScoredCandidate {
                store_id: 2,
                store_name: "B",
                score: 160.0,
                available: Some(10),
            },
            ScoredCandidate {
                store_id: 3,
                store_name: "C",
                score: 110.0,
                available: Some(10),
            },
        ];
        let (allocations, remaining) = split_quantity(47, &candidates);
        assert_eq!(allocations.iter().map(|a| a.quantity).sum::<i32>(), 30);
        assert_eq!(remaining, 17);
    }

    #[test]
    fn unbounded_candidate_absorbs_everything() {
        let candidates = vec![ScoredCandidate {
            store_id: 1,
            store_name: "A",
            score: 100.0,
            available: None,
        }];
        let (allocations, remaining) = split_quantity(99, &candidates);
        assert_eq!(allocations[0].quantity, 99);
        assert_eq!(remaining, 0);
    }
}
