use sea_orm_migration::prelude::*;

use super::m20250110_000002_create_stores_table::Stores;
use super::m20250110_000006_create_order_items_table::OrderItems;
use super::m20250110_000007_create_purchase_lists_table::PurchaseLists;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PurchaseListItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseListItems::ListItemId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PurchaseListItems::ListId).integer().not_null())
                    .col(ColumnDef::new(PurchaseListItems::ItemId).integer().not_null())
                    .col(ColumnDef::new(PurchaseListItems::StoreId).integer().not_null())
                    .col(
                        ColumnDef::new(PurchaseListItems::QuantityToPurchase)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(PurchaseListItems::SequenceOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PurchaseListItems::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(PurchaseListItems::FailureReason)
                            .string()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pli_list_id")
                            .from(PurchaseListItems::Table, PurchaseListItems::ListId)
                            .to(PurchaseLists::Table, PurchaseLists::ListId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pli_item_id")
                            .from(PurchaseListItems::Table, PurchaseListItems::ItemId)
                            .to(OrderItems::Table, OrderItems::ItemId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pli_store_id")
                            .from(PurchaseListItems::Table, PurchaseListItems::StoreId)
                            .to(Stores::Table, Stores::StoreId),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PurchaseListItems::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum PurchaseListItems {
    Table,
    ListItemId,
    ListId,
    ItemId,
    StoreId,
    QuantityToPurchase,
    SequenceOrder,
    Status,
    FailureReason,
}
