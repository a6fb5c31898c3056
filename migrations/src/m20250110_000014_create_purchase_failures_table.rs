use sea_orm_migration::prelude::*;

use super::m20250110_000002_create_stores_table::Stores;
use super::m20250110_000006_create_order_items_table::OrderItems;
use super::m20250110_000008_create_purchase_list_items_table::PurchaseListItems;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PurchaseFailures::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseFailures::FailureId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PurchaseFailures::ListItemId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PurchaseFailures::ItemId).integer().not_null())
                    .col(ColumnDef::new(PurchaseFailures::StoreId).integer().not_null())
                    .col(
                        ColumnDef::new(PurchaseFailures::FailureType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseFailures::FailureDate)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseFailures::ExpectedRestockDate)
                            .date()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseFailures::AlternativeStoreId)
                            .integer()
                            .null(),
                    )
                    .col(ColumnDef::new(PurchaseFailures::Notes).text().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pf_list_item_id")
                            .from(PurchaseFailures::Table, PurchaseFailures::ListItemId)
                            .to(PurchaseListItems::Table, PurchaseListItems::ListItemId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pf_item_id")
                            .from(PurchaseFailures::Table, PurchaseFailures::ItemId)
                            .to(OrderItems::Table, OrderItems::ItemId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pf_store_id")
                            .from(PurchaseFailures::Table, PurchaseFailures::StoreId)
                            .to(Stores::Table, Stores::StoreId),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PurchaseFailures::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum PurchaseFailures {
    Table,
    FailureId,
    ListItemId,
    ItemId,
    StoreId,
    FailureType,
    FailureDate,
    ExpectedRestockDate,
    AlternativeStoreId,
    Notes,
}
