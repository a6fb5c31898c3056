use sea_orm_migration::prelude::*;

use super::m20250110_000002_create_stores_table::Stores;
use super::m20250110_000009_create_routes_table::Routes;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RouteStops::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RouteStops::StopId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RouteStops::RouteId).integer().not_null())
                    .col(ColumnDef::new(RouteStops::StoreId).integer().not_null())
                    .col(ColumnDef::new(RouteStops::StopSequence).integer().not_null())
                    .col(
                        ColumnDef::new(RouteStops::EstimatedArrival)
                            .timestamp()
                            .null(),
                    )
                    .col(ColumnDef::new(RouteStops::ActualArrival).timestamp().null())
                    .col(
                        ColumnDef::new(RouteStops::ActualDeparture)
                            .timestamp()
                            .null(),
                    )
                    // order item ids covered by this stop
                    .col(ColumnDef::new(RouteStops::ItemsToPurchase).json().null())
                    .col(
                        ColumnDef::new(RouteStops::ItemsCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(RouteStops::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_route_stops_route_id")
                            .from(RouteStops::Table, RouteStops::RouteId)
                            .to(Routes::Table, Routes::RouteId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_route_stops_store_id")
                            .from(RouteStops::Table, RouteStops::StoreId)
                            .to(Stores::Table, Stores::StoreId),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RouteStops::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum RouteStops {
    Table,
    StopId,
    RouteId,
    StoreId,
    StopSequence,
    EstimatedArrival,
    ActualArrival,
    ActualDeparture,
    ItemsToPurchase,
    ItemsCount,
    Status,
}
