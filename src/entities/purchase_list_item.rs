use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "purchased")]
    Purchased,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "skipped")]
    Skipped,
}

/// One atomic buy task: a quantity of one order item at one store.
/// Across all tasks of an order item, `quantity_to_purchase` sums to the
/// item's quantity (any shortfall is reported as a remainder instead).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_list_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub list_item_id: i32,
    pub list_id: i32,
    pub item_id: i32,
    pub store_id: i32,
    pub quantity_to_purchase: i32,
    pub sequence_order: i32,
    pub status: PurchaseStatus,
    pub failure_reason: Option<String>,
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
        belongs_to = "super::order_item::Entity",
        from = "Column::ItemId",
        to = "super::order_item::Column::ItemId"
    )]
    OrderItem,
    #[sea_orm(
        belongs_to = "super::store::Entity",
        from = "Column::StoreId",
        to = "super::store::Column::StoreId"
    )]
    Store,
}

impl Related<super::purchase_list::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseList.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
