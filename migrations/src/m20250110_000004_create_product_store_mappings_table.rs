use sea_orm_migration::prelude::*;

use super::m20250110_000002_create_stores_table::Stores;
use super::m20250110_000003_create_products_table::Products;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProductStoreMappings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductStoreMappings::MappingId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProductStoreMappings::ProductId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductStoreMappings::StoreId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductStoreMappings::IsPrimaryStore)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(ProductStoreMappings::Priority).integer().null())
                    .col(
                        ColumnDef::new(ProductStoreMappings::StockStatus)
                            .string()
                            .not_null()
                            .default("unknown"),
                    )
                    .col(
                        ColumnDef::new(ProductStoreMappings::MaxDailyQuantity)
                            .integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ProductStoreMappings::CurrentAvailable)
                            .integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ProductStoreMappings::UpdatedAt)
                            .timestamp()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_psm_product_id")
                            .from(ProductStoreMappings::Table, ProductStoreMappings::ProductId)
                            .to(Products::Table, Products::ProductId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_psm_store_id")
                            .from(ProductStoreMappings::Table, ProductStoreMappings::StoreId)
                            .to(Stores::Table, Stores::StoreId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_psm_product_store")
                    .table(ProductStoreMappings::Table)
                    .col(ProductStoreMappings::ProductId)
                    .col(ProductStoreMappings::StoreId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProductStoreMappings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ProductStoreMappings {
    Table,
    MappingId,
    ProductId,
    StoreId,
    IsPrimaryStore,
    Priority,
    StockStatus,
    MaxDailyQuantity,
    CurrentAvailable,
    UpdatedAt,
}
