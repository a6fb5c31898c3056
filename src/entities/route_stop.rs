use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StopStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "current")]
    Current,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "skipped")]
    Skipped,
}

/// One store visit within a route. `stop_sequence` is 1-based and dense.
/// `items_to_purchase` holds the covered order item ids as a JSON array;
/// `items_count` is the total quantity to buy at the stop.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "route_stops")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub stop_id: i32,
    pub route_id: i32,
    pub store_id: i32,
    pub stop_sequence: i32,
    pub estimated_arrival: Option<NaiveDateTime>,
    pub actual_arrival: Option<NaiveDateTime>,
    pub actual_departure: Option<NaiveDateTime>,
    pub items_to_purchase: Option<Json>,
    pub items_count: i32,
    pub status: StopStatus,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::route::Entity",
        from = "Column::RouteId",
        to = "super::route::Column::RouteId"
    )]
    Route,
    #[sea_orm(
        belongs_to = "super::store::Entity",
        from = "Column::StoreId",
        to = "super::store::Column::StoreId"
    )]
    Store,
}

impl Related<super::route::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Route.def()
    }
}

impl Related<super::store::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Store.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
