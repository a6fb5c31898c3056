use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Holidays::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Holidays::HolidayId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Holidays::HolidayDate)
                            .date()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Holidays::HolidayName).string().null())
                    .col(
                        ColumnDef::new(Holidays::IsWorking)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Holidays::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Holidays {
    Table,
    HolidayId,
    HolidayDate,
    HolidayName,
    IsWorking,
}
