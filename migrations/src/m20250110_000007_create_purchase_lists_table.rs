use sea_orm_migration::prelude::*;

use super::m20250110_000001_create_staff_table::Staff;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PurchaseLists::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseLists::ListId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PurchaseLists::StaffId).integer().not_null())
                    .col(ColumnDef::new(PurchaseLists::PurchaseDate).date().not_null())
                    .col(
                        ColumnDef::new(PurchaseLists::Status)
                            .string()
                            .not_null()
                            .default("draft"),
                    )
                    .col(
                        ColumnDef::new(PurchaseLists::TotalItems)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PurchaseLists::TotalStores)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(PurchaseLists::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(PurchaseLists::UpdatedAt).timestamp().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_lists_staff_id")
                            .from(PurchaseLists::Table, PurchaseLists::StaffId)
                            .to(Staff::Table, Staff::StaffId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One list per buyer per day; last line of defense against
        // concurrent plan runs for the same date.
        manager
            .create_index(
                Index::create()
                    .name("uq_purchase_lists_staff_date")
                    .table(PurchaseLists::Table)
                    .col(PurchaseLists::StaffId)
                    .col(PurchaseLists::PurchaseDate)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PurchaseLists::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum PurchaseLists {
    Table,
    ListId,
    StaffId,
    PurchaseDate,
    Status,
    TotalItems,
    TotalStores,
    CreatedAt,
    UpdatedAt,
}
