use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Stores::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Stores::StoreId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Stores::StoreName).string().not_null())
                    .col(ColumnDef::new(Stores::StoreCode).string().null())
                    .col(ColumnDef::new(Stores::Address).string().null())
                    .col(ColumnDef::new(Stores::District).string().null())
                    .col(ColumnDef::new(Stores::Category).string().null())
                    .col(ColumnDef::new(Stores::Latitude).decimal_len(10, 7).null())
                    .col(ColumnDef::new(Stores::Longitude).decimal_len(10, 7).null())
                    .col(
                        ColumnDef::new(Stores::PriorityLevel)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    // weekday -> "HH:MM-HH:MM"
                    .col(ColumnDef::new(Stores::OpeningHours).json().null())
                    .col(
                        ColumnDef::new(Stores::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Stores::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Stores::UpdatedAt).timestamp().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Stores::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Stores {
    Table,
    StoreId,
    StoreName,
    StoreCode,
    Address,
    District,
    Category,
    Latitude,
    Longitude,
    PriorityLevel,
    OpeningHours,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
