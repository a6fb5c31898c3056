use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A physical store. Coordinates are optional; stores without them still
/// appear in allocations but are ordered after all geo-located stops.
/// `opening_hours` maps weekday names to "HH:MM-HH:MM" windows.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stores")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub store_id: i32,
    pub store_name: String,
    pub store_code: Option<String>,
    pub address: Option<String>,
    pub district: Option<String>,
    pub category: Option<String>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub priority_level: i32,
    pub opening_hours: Option<Json>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_store_mapping::Entity")]
    ProductMappings,
    #[sea_orm(has_many = "super::route_stop::Entity")]
    RouteStops,
}

impl Related<super::product_store_mapping::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductMappings.def()
    }
}

impl Related<super::route_stop::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RouteStops.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
