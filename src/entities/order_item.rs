use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "assigned")]
    Assigned,
    #[sea_orm(string_value = "purchased")]
    Purchased,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "discontinued")]
    Discontinued,
    #[sea_orm(string_value = "out_of_stock")]
    OutOfStock,
    #[sea_orm(string_value = "restocking")]
    Restocking,
}

/// A single order line. Bundles never participate in assignment directly;
/// they are expanded into child items linked back via `parent_item_id`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub item_id: i32,
    pub order_id: i32,
    pub sku: String,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
    pub is_bundle: bool,
    pub parent_item_id: Option<i32>,
    pub status: ItemStatus,
    pub priority: String,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::OrderId"
    )]
    Order,
    #[sea_orm(has_many = "super::purchase_list_item::Entity")]
    PurchaseListItems,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::purchase_list_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseListItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
