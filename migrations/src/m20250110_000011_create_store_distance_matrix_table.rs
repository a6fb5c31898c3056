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
                    .table(StoreDistanceMatrix::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StoreDistanceMatrix::EntryId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(StoreDistanceMatrix::FromStoreId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StoreDistanceMatrix::ToStoreId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StoreDistanceMatrix::DistanceKm)
                            .decimal_len(8, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StoreDistanceMatrix::TravelTimeMinutes)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(StoreDistanceMatrix::LastCalculated)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sdm_from_store_id")
                            .from(StoreDistanceMatrix::Table, StoreDistanceMatrix::FromStoreId)
                            .to(Stores::Table, Stores::StoreId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sdm_to_store_id")
                            .from(StoreDistanceMatrix::Table, StoreDistanceMatrix::ToStoreId)
                            .to(Stores::Table, Stores::StoreId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_sdm_from_to")
                    .table(StoreDistanceMatrix::Table)
                    .col(StoreDistanceMatrix::FromStoreId)
                    .col(StoreDistanceMatrix::ToStoreId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StoreDistanceMatrix::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum StoreDistanceMatrix {
    Table,
    EntryId,
    FromStoreId,
    ToStoreId,
    DistanceKm,
    TravelTimeMinutes,
    LastCalculated,
}
