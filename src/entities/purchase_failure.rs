use chrono::{NaiveDate, NaiveDateTime};
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
pub enum FailureType {
    #[sea_orm(string_value = "discontinued")]
    Discontinued,
    #[sea_orm(string_value = "out_of_stock")]
    OutOfStock,
    #[sea_orm(string_value = "store_closed")]
    StoreClosed,
    #[sea_orm(string_value = "price_mismatch")]
    PriceMismatch,
    #[sea_orm(string_value = "product_not_found")]
    ProductNotFound,
    #[sea_orm(string_value = "other")]
    Other,
}

/// Observation record for a failed buy. Pure analytics channel; recording a
/// failure never triggers re-allocation.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_failures")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub failure_id: i32,
    pub list_item_id: i32,
    pub item_id: i32,
    pub store_id: i32,
    pub failure_type: FailureType,
    pub failure_date: NaiveDateTime,
    pub expected_restock_date: Option<NaiveDate>,
    pub alternative_store_id: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::purchase_list_item::Entity",
        from = "Column::ListItemId",
        to = "super::purchase_list_item::Column::ListItemId"
    )]
    ListItem,
    #[sea_orm(
        belongs_to = "super::order_item::Entity",
        from = "Column::ItemId",
        to = "super::order_item::Column::ItemId"
    )]
    OrderItem,
}

impl ActiveModelBehavior for ActiveModel {}
