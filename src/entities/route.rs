use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    #[sea_orm(string_value = "not_started")]
    NotStarted,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// One route per (buyer, date), coupled to a purchase list. Regeneration
/// reuses the row and rebuilds the stops so execution references survive.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "routes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub route_id: i32,
    pub list_id: i32,
    pub staff_id: i32,
    pub route_date: NaiveDate,
    pub status: RouteStatus,
    pub total_distance_km: Option<Decimal>,
    pub estimated_time_minutes: Option<i32>,
    pub start_location_lat: Option<Decimal>,
    pub start_location_lng: Option<Decimal>,
    pub include_return: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::purchase_list::Entity",
        from = "Column::ListId",
        to = "super::purchase_list::Column::ListId"
    )]
    PurchaseList,
    #[sea_orm(
        belongs_to = "super::staff::Entity",
        from = "Column::StaffId",
        to = "super::staff::Column::StaffId"
    )]
    Staff,
    #[sea_orm(has_many = "super::route_stop::Entity")]
    Stops,
}

impl Related<super::purchase_list::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseList.def()
    }
}

impl Related<super::staff::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Staff.def()
    }
}

impl Related<super::route_stop::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stops.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
