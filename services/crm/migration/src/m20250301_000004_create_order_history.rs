use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OrderHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderHistory::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrderHistory::OrderId).integer().not_null())
                    .col(ColumnDef::new(OrderHistory::UserId).integer())
                    .col(ColumnDef::new(OrderHistory::Action).string_len(50).not_null())
                    .col(ColumnDef::new(OrderHistory::FieldName).string_len(50))
                    .col(ColumnDef::new(OrderHistory::OldValue).text())
                    .col(ColumnDef::new(OrderHistory::NewValue).text())
                    .col(ColumnDef::new(OrderHistory::Comment).text())
                    .col(
                        ColumnDef::new(OrderHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(OrderHistory::Table, OrderHistory::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(OrderHistory::Table, OrderHistory::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(OrderHistory::Table)
                    .col(OrderHistory::OrderId)
                    .name("idx_order_history_order_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrderHistory::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum OrderHistory {
    Table,
    Id,
    OrderId,
    UserId,
    Action,
    FieldName,
    OldValue,
    NewValue,
    Comment,
    CreatedAt,
}

#[derive(Iden)]
enum Orders {
    Table,
    Id,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}
