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
                        ColumnDef::new(Orders::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Orders::ProjectId).integer().not_null())
                    .col(ColumnDef::new(Orders::CustomerName).string().not_null())
                    .col(ColumnDef::new(Orders::CustomerPhone).string_len(32).not_null())
                    .col(ColumnDef::new(Orders::CustomerEmail).string())
                    .col(ColumnDef::new(Orders::City).string())
                    .col(ColumnDef::new(Orders::Address).text())
                    .col(ColumnDef::new(Orders::TrackingNumber).string())
                    .col(
                        ColumnDef::new(Orders::TotalAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Orders::StatusId).integer().not_null())
                    .col(ColumnDef::new(Orders::OperatorId).integer())
                    .col(
                        ColumnDef::new(Orders::CallAttempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Orders::LastCallResult).string_len(20))
                    .col(ColumnDef::new(Orders::NextCallAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Orders::CustomFields)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'{}'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Orders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Orders::StatusUpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Orders::ApprovedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Orders::ShippedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Orders::CanceledAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Orders::Table, Orders::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Orders::Table, Orders::StatusId)
                            .to(OrderStatuses::Table, OrderStatuses::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Orders::Table, Orders::OperatorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
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

#[derive(Iden)]
enum Orders {
    Table,
    Id,
    ProjectId,
    CustomerName,
    CustomerPhone,
    CustomerEmail,
    City,
    Address,
    TrackingNumber,
    TotalAmount,
    StatusId,
    OperatorId,
    CallAttempts,
    LastCallResult,
    NextCallAt,
    CustomFields,
    CreatedAt,
    UpdatedAt,
    StatusUpdatedAt,
    ApprovedAt,
    ShippedAt,
    CanceledAt,
}

#[derive(Iden)]
enum Projects {
    Table,
    Id,
}

#[derive(Iden)]
enum OrderStatuses {
    Table,
    Id,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}
