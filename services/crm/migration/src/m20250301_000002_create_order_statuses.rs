use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OrderStatuses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderStatuses::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrderStatuses::ProjectId).integer().not_null())
                    .col(ColumnDef::new(OrderStatuses::Name).string().not_null())
                    .col(
                        ColumnDef::new(OrderStatuses::StatusGroup)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrderStatuses::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(OrderStatuses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(OrderStatuses::Table, OrderStatuses::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(OrderStatuses::Table)
                    .col(OrderStatuses::ProjectId)
                    .col(OrderStatuses::StatusGroup)
                    .col(OrderStatuses::Position)
                    .name("idx_order_statuses_project_group_position")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrderStatuses::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum OrderStatuses {
    Table,
    Id,
    ProjectId,
    Name,
    StatusGroup,
    Position,
    CreatedAt,
}

#[derive(Iden)]
enum Projects {
    Table,
    Id,
}
