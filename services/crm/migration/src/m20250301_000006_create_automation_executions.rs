use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AutomationExecutions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AutomationExecutions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AutomationExecutions::RuleId).integer().not_null())
                    .col(ColumnDef::new(AutomationExecutions::OrderId).integer().not_null())
                    .col(
                        ColumnDef::new(AutomationExecutions::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(AutomationExecutions::Refireable)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(AutomationExecutions::Result).json_binary())
                    .col(ColumnDef::new(AutomationExecutions::ErrorMessage).text())
                    .col(
                        ColumnDef::new(AutomationExecutions::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(AutomationExecutions::CompletedAt)
                            .timestamp_with_time_zone(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(AutomationExecutions::Table, AutomationExecutions::RuleId)
                            .to(AutomationRules::Table, AutomationRules::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(AutomationExecutions::Table, AutomationExecutions::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Dedup claim: one in-flight or completed execution per (rule, order)
        // for non-re-fireable triggers. Failed rows stay outside the index.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS uq_automation_executions_claim \
                 ON automation_executions (rule_id, order_id) \
                 WHERE status IN ('running', 'completed') AND refireable = false",
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(AutomationExecutions::Table)
                    .col(AutomationExecutions::RuleId)
                    .col(AutomationExecutions::OrderId)
                    .col(AutomationExecutions::StartedAt)
                    .name("idx_automation_executions_rule_order_started")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AutomationExecutions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AutomationExecutions {
    Table,
    Id,
    RuleId,
    OrderId,
    Status,
    Refireable,
    Result,
    ErrorMessage,
    StartedAt,
    CompletedAt,
}

#[derive(Iden)]
enum AutomationRules {
    Table,
    Id,
}

#[derive(Iden)]
enum Orders {
    Table,
    Id,
}
