use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BusinessRules::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BusinessRules::RuleId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BusinessRules::RuleKey)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(BusinessRules::RuleValue).json().not_null())
                    .col(ColumnDef::new(BusinessRules::Description).string().null())
                    .col(
                        ColumnDef::new(BusinessRules::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(BusinessRules::UpdatedAt).timestamp().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BusinessRules::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum BusinessRules {
    Table,
    RuleId,
    RuleKey,
    RuleValue,
    Description,
    IsActive,
    UpdatedAt,
}
