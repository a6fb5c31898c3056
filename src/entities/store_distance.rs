use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Pre-computed directional store-to-store distance. The matrix is a cache:
/// absence of a pair triggers an on-the-fly Haversine fallback, so route
/// correctness never depends on pre-computation.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "store_distance_matrix")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub entry_id: i32,
    pub from_store_id: i32,
    pub to_store_id: i32,
    pub distance_km: Decimal,
    pub travel_time_minutes: i32,
    pub last_calculated: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::store::Entity",
        from = "Column::FromStoreId",
        to = "super::store::Column::StoreId"
    )]
    FromStore,
    #[sea_orm(
        belongs_to = "super::store::Entity",
        from = "Column::ToStoreId",
        to = "super::store::Column::StoreId"
    )]
    ToStore,
}

impl ActiveModelBehavior for ActiveModel {}
