use std::collections::HashMap;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use tracing::{info, instrument};

use crate::{
    common::jst_now,
    entities::{
        store::{self, Entity as StoreEntity},
        store_distance::{self, Entity as StoreDistanceEntity},
    },
    errors::ServiceError,
    services::geo::{self, Coordinates},
};

/// Pre-compute pairwise distances between all active geo-located stores.
///
/// Entries are directional and upserted per (from, to) pair; travel time is
/// derived at the urban speed assumption. Returns the number of pairs
/// written.
#[instrument(skip(conn))]
pub async fn rebuild<C: ConnectionTrait>(conn: &C) -> Result<u64, ServiceError> {
    let stores = StoreEntity::find()
        .filter(store::Column::IsActive.eq(true))
        .filter(store::Column::Latitude.is_not_null())
        .filter(store::Column::Longitude.is_not_null())
        .all(conn)
        .await?;

    if stores.len() < 2 {
        return Ok(0);
    }

    let now = jst_now();
    let mut written = 0u64;

    for from in &stores {
        let from_coords = Coordinates::from_decimals(from.latitude, from.longitude);
        for to in &stores {
            if from.store_id == to.store_id {
                continue;
            }
            let to_coords = Coordinates::from_decimals(to.latitude, to.longitude);
            let (Some(a), Some(b)) = (from_coords, to_coords) else {
                continue;
            };

            let distance = geo::haversine_km(a, b);
            let entry = store_distance::ActiveModel {
                from_store_id: Set(from.store_id),
                to_store_id: Set(to.store_id),
                distance_km: Set(Decimal::from_f64(distance)
                    .unwrap_or_default()
                    .round_dp(2)),
                travel_time_minutes: Set(geo::travel_minutes(distance) as i32),
                last_calculated: Set(now),
                ..Default::default()
            };

            StoreDistanceEntity::insert(entry)
                .on_conflict(
                    OnConflict::columns([
                        store_distance::Column::FromStoreId,
                        store_distance::Column::ToStoreId,
                    ])
                    .update_columns([
                        store_distance::Column::DistanceKm,
                        store_distance::Column::TravelTimeMinutes,
                        store_distance::Column::LastCalculated,
                    ])
                    .to_owned(),
                )
                .exec(conn)
                .await?;
            written += 1;
        }
    }

    info!(pairs = written, "store distance matrix rebuilt");
    Ok(written)
}

/// Distance and travel time between two stores: matrix entry when cached,
/// Haversine on the fly otherwise. Stores without coordinates yield zero.
pub async fn distance_between<C: ConnectionTrait>(
    conn: &C,
    from_store_id: i32,
    to_store_id: i32,
) -> Result<(f64, i64), ServiceError> {
    let cached = StoreDistanceEntity::find()
        .filter(store_distance::Column::FromStoreId.eq(from_store_id))
        .filter(store_distance::Column::ToStoreId.eq(to_store_id))
        .one(conn)
        .await?;

    if let Some(entry) = cached {
        let km = entry.distance_km.to_f64().unwrap_or(0.0);
        return Ok((km, i64::from(entry.travel_time_minutes)));
    }

    let stores = StoreEntity::find()
        .filter(store::Column::StoreId.is_in([from_store_id, to_store_id]))
        .all(conn)
        .await?;
    let coords: HashMap<i32, Option<Coordinates>> = stores
        .iter()
        .map(|s| (s.store_id, Coordinates::from_decimals(s.latitude, s.longitude)))
        .collect();

    match (
        coords.get(&from_store_id).copied().flatten(),
        coords.get(&to_store_id).copied().flatten(),
    ) {
        (Some(a), Some(b)) => {
            let km = geo::haversine_km(a, b);
            Ok((km, geo::travel_minutes(km)))
        }
        _ => Ok((0.0, 0)),
    }
}

/// Bulk-fetch the cached submatrix restricted to the given stores.
pub async fn submatrix<C: ConnectionTrait>(
    conn: &C,
    store_ids: &[i32],
) -> Result<HashMap<(i32, i32), f64>, ServiceError> {
    if store_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let entries = StoreDistanceEntity::find()
        .filter(store_distance::Column::FromStoreId.is_in(store_ids.to_vec()))
        .filter(store_distance::Column::ToStoreId.is_in(store_ids.to_vec()))
        .all(conn)
        .await?;

    Ok(entries
        .into_iter()
        .map(|e| {
            (
                (e.from_store_id, e.to_store_id),
                e.distance_km.to_f64().unwrap_or(0.0),
            )
        })
        .collect())
}

/// Nearest cached neighbors of a store, closest first.
pub async fn nearest_stores<C: ConnectionTrait>(
    conn: &C,
    from_store_id: i32,
    limit: u64,
) -> Result<Vec<(i32, f64, i64)>, ServiceError> {
    let entries = StoreDistanceEntity::find()
        .filter(store_distance::Column::FromStoreId.eq(from_store_id))
        .order_by_asc(store_distance::Column::DistanceKm)
        .limit(limit)
        .all(conn)
        .await?;

    Ok(entries
        .into_iter()
        .map(|e| {
            (
                e.to_store_id,
                e.distance_km.to_f64().unwrap_or(0.0),
                i64::from(e.travel_time_minutes),
            )
        })
        .collect())
}
