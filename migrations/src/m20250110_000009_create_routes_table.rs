use sea_orm_migration::prelude::*;

use super::m20250110_000001_create_staff_table::Staff;
use super::m20250110_000007_create_purchase_lists_table::PurchaseLists;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Routes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Routes::RouteId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Routes::ListId).integer().not_null())
                    .col(ColumnDef::new(Routes::StaffId).integer().not_null())
                    .col(ColumnDef::new(Routes::RouteDate).date().not_null())
                    .col(
                        ColumnDef::new(Routes::Status)
                            .string()
                            .not_null()
                            .default("not_started"),
                    )
                    .col(
                        ColumnDef::new(Routes::TotalDistanceKm)
                            .decimal_len(8, 2)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Routes::EstimatedTimeMinutes)
                            .integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Routes::StartLocationLat)
                            .decimal_len(10, 7)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Routes::StartLocationLng)
                            .decimal_len(10, 7)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Routes::IncludeReturn)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Routes::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Routes::UpdatedAt).timestamp().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_routes_list_id")
                            .from(Routes::Table, Routes::ListId)
                            .to(PurchaseLists::Table, PurchaseLists::ListId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_routes_staff_id")
                            .from(Routes::Table, Routes::StaffId)
                            .to(Staff::Table, Staff::StaffId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Routes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Routes {
    Table,
    RouteId,
    ListId,
    StaffId,
    RouteDate,
    Status,
    TotalDistanceKm,
    EstimatedTimeMinutes,
    StartLocationLat,
    StartLocationLng,
    IncludeReturn,
    CreatedAt,
    UpdatedAt,
}
