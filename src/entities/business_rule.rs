use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Key-value policy record read by the planners. Values are JSON so a rule
/// can be a scalar ("13:10", true) or a structured object.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "business_rules")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub rule_id: i32,
    #[sea_orm(unique)]
    pub rule_key: String,
    pub rule_value: Json,
    pub description: Option<String>,
    pub is_active: bool,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
