use sea_orm_migration::prelude::*;

use super::m20250110_000005_create_orders_table::Orders;
use super::m20250110_000006_create_order_items_table::OrderItems;
use super::m20250110_000008_create_purchase_list_items_table::PurchaseListItems;
use super::m20250110_000010_create_route_stops_table::RouteStops;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // The daily plan selects pending orders by target date.
        manager
            .create_index(
                Index::create()
                    .name("idx_orders_target_date_status")
                    .table(Orders::Table)
                    .col(Orders::TargetPurchaseDate)
                    .col(Orders::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_order_items_order_status")
                    .table(OrderItems::Table)
                    .col(OrderItems::OrderId)
                    .col(OrderItems::Status)
                    .to_owned(),
            )
            .await?;

        // Stop completion cascades look items up by (list, store).
        manager
            .create_index(
                Index::create()
                    .name("idx_pli_list_store")
                    .table(PurchaseListItems::Table)
                    .col(PurchaseListItems::ListId)
                    .col(PurchaseListItems::StoreId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_route_stops_route_sequence")
                    .table(RouteStops::Table)
                    .col(RouteStops::RouteId)
                    .col(RouteStops::StopSequence)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_orders_target_date_status")
                    .table(Orders::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_order_items_order_status")
                    .table(OrderItems::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_pli_list_store")
                    .table(PurchaseListItems::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_route_stops_route_sequence")
                    .table(RouteStops::Table)
                    .to_owned(),
            )
            .await
    }
}
