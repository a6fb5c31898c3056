use sea_orm_migration::prelude::*;

use super::m20250110_000002_create_stores_table::Stores;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Products::ProductId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Products::Sku)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Products::ProductName).string().not_null())
                    .col(ColumnDef::new(Products::Category).string().null())
                    .col(
                        ColumnDef::new(Products::IsStoreFixed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Products::FixedStoreId).integer().null())
                    .col(
                        ColumnDef::new(Products::ExcludeFromRouting)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    // {"items": [{"sku": ..., "qty": ...}, ...]}
                    .col(ColumnDef::new(Products::SetSplitRule).json().null())
                    .col(ColumnDef::new(Products::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Products::UpdatedAt).timestamp().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_products_fixed_store_id")
                            .from(Products::Table, Products::FixedStoreId)
                            .to(Stores::Table, Stores::StoreId)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Products {
    Table,
    ProductId,
    Sku,
    ProductName,
    Category,
    IsStoreFixed,
    FixedStoreId,
    ExcludeFromRouting,
    SetSplitRule,
    CreatedAt,
    UpdatedAt,
}
