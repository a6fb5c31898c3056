use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Staff::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Staff::StaffId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Staff::StaffName).string().not_null())
                    .col(ColumnDef::new(Staff::StaffCode).string().null())
                    .col(
                        ColumnDef::new(Staff::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Staff::PasswordHash).string().not_null())
                    .col(
                        ColumnDef::new(Staff::Role)
                            .string()
                            .not_null()
                            .default("buyer"),
                    )
                    .col(
                        ColumnDef::new(Staff::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Staff::MaxDailyCapacity)
                            .integer()
                            .not_null()
                            .default(20),
                    )
                    .col(ColumnDef::new(Staff::StartLocationName).string().null())
                    .col(
                        ColumnDef::new(Staff::StartLocationLat)
                            .decimal_len(10, 7)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Staff::StartLocationLng)
                            .decimal_len(10, 7)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Staff::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Staff::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Staff::UpdatedAt).timestamp().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Staff::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Staff {
    Table,
    StaffId,
    StaffName,
    StaffCode,
    Email,
    PasswordHash,
    Role,
    Status,
    MaxDailyCapacity,
    StartLocationName,
    StartLocationLat,
    StartLocationLng,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
