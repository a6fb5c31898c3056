use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Orders::OrderId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Orders::ExternalOrderId).string().null())
                    .col(ColumnDef::new(Orders::SourceChannel).string().null())
                    .col(ColumnDef::new(Orders::CustomerName).string().null())
                    .col(ColumnDef::new(Orders::OrderDate).timestamp().not_null())
                    .col(ColumnDef::new(Orders::TargetPurchaseDate).date().null())
                    .col(
                        ColumnDef::new(Orders::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Orders::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Orders::UpdatedAt).timestamp().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Orders {
    Table,
    OrderId,
    ExternalOrderId,
    SourceChannel,
    CustomerName,
    OrderDate,
    TargetPurchaseDate,
    Status,
    CreatedAt,
    UpdatedAt,
}
