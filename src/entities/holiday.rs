use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Calendar override for the cutoff scheduler. `is_working` lets a single
/// holiday count as a business day despite the global policy.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "holidays")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub holiday_id: i32,
    #[sea_orm(unique)]
    pub holiday_date: NaiveDate,
    pub holiday_name: Option<String>,
    pub is_working: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
