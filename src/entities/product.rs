use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product master keyed by SKU. `set_split_rule` holds the bundle expansion
/// rule as `{"items": [{"sku": ..., "qty": ...}]}`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub product_id: i32,
    #[sea_orm(unique)]
    pub sku: String,
    pub product_name: String,
    pub category: Option<String>,
    pub is_store_fixed: bool,
    pub fixed_store_id: Option<i32>,
    pub exclude_from_routing: bool,
    pub set_split_rule: Option<Json>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_store_mapping::Entity")]
    StoreMappings,
    #[sea_orm(
        belongs_to = "super::store::Entity",
        from = "Column::FixedStoreId",
        to = "super::store::Column::StoreId"
    )]
    FixedStore,
}

impl Related<super::product_store_mapping::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StoreMappings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
