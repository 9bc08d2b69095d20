use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AutomationRules::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AutomationRules::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AutomationRules::ProjectId).integer().not_null())
                    .col(ColumnDef::new(AutomationRules::Name).string().not_null())
                    .col(ColumnDef::new(AutomationRules::Description).text())
                    .col(
                        ColumnDef::new(AutomationRules::TriggerConditions)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AutomationRules::Actions)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AutomationRules::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(AutomationRules::Priority)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(AutomationRules::ExecutionsCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(AutomationRules::LastExecutedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(AutomationRules::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(AutomationRules::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(AutomationRules::Table, AutomationRules::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AutomationRules::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AutomationRules {
    Table,
    Id,
    ProjectId,
    Name,
    Description,
    TriggerConditions,
    Actions,
    IsActive,
    Priority,
    ExecutionsCount,
    LastExecutedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Projects {
    Table,
    Id,
}
