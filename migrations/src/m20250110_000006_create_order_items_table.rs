use sea_orm_migration::prelude::*;

use super::m20250110_000005_create_orders_table::Orders;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OrderItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderItems::ItemId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrderItems::OrderId).integer().not_null())
                    .col(ColumnDef::new(OrderItems::Sku).string().not_null())
                    .col(ColumnDef::new(OrderItems::ProductName).string().not_null())
                    .col(
                        ColumnDef::new(OrderItems::Quantity)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(OrderItems::UnitPrice).decimal_len(12, 2).null())
                    .col(
                        ColumnDef::new(OrderItems::IsBundle)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(OrderItems::ParentItemId).integer().null())
                    .col(
                        ColumnDef::new(OrderItems::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(OrderItems::Priority)
                            .string()
                            .not_null()
                            .default("normal"),
                    )
                    .col(ColumnDef::new(OrderItems::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(OrderItems::UpdatedAt).timestamp().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_items_order_id")
                            .from(OrderItems::Table, OrderItems::OrderId)
                            .to(Orders::Table, Orders::OrderId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_items_parent_item_id")
                            .from(OrderItems::Table, OrderItems::ParentItemId)
                            .to(OrderItems::Table, OrderItems::ItemId)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrderItems::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum OrderItems {
    Table,
    ItemId,
    OrderId,
    Sku,
    ProductName,
    Quantity,
    UnitPrice,
    IsBundle,
    ParentItemId,
    Status,
    Priority,
    CreatedAt,
    UpdatedAt,
}
