use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SmsTemplates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SmsTemplates::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SmsTemplates::ProjectId).integer().not_null())
                    .col(ColumnDef::new(SmsTemplates::Name).string().not_null())
                    .col(ColumnDef::new(SmsTemplates::Content).text().not_null())
                    .col(
                        ColumnDef::new(SmsTemplates::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(SmsTemplates::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(SmsTemplates::Table, SmsTemplates::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SmsMessages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SmsMessages::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SmsMessages::ProjectId).integer().not_null())
                    .col(ColumnDef::new(SmsMessages::OrderId).integer())
                    .col(ColumnDef::new(SmsMessages::TemplateId).integer())
                    .col(ColumnDef::new(SmsMessages::PhoneNumber).string_len(32).not_null())
                    .col(ColumnDef::new(SmsMessages::Content).text().not_null())
                    .col(
                        ColumnDef::new(SmsMessages::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(SmsMessages::Provider).string_len(50))
                    .col(ColumnDef::new(SmsMessages::ExternalId).string())
                    .col(ColumnDef::new(SmsMessages::ErrorMessage).text())
                    .col(ColumnDef::new(SmsMessages::SentAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(SmsMessages::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(SmsMessages::Table, SmsMessages::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(SmsMessages::Table, SmsMessages::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(SmsMessages::Table, SmsMessages::TemplateId)
                            .to(SmsTemplates::Table, SmsTemplates::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SmsMessages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SmsTemplates::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SmsTemplates {
    Table,
    Id,
    ProjectId,
    Name,
    Content,
    IsActive,
    CreatedAt,
}

#[derive(Iden)]
enum SmsMessages {
    Table,
    Id,
    ProjectId,
    OrderId,
    TemplateId,
    PhoneNumber,
    Content,
    Status,
    Provider,
    ExternalId,
    ErrorMessage,
    SentAt,
    CreatedAt,
}

#[derive(Iden)]
enum Projects {
    Table,
    Id,
}

#[derive(Iden)]
enum Orders {
    Table,
    Id,
}
