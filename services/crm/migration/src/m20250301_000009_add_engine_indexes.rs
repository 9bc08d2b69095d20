use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Trigger scans: per project and status, by status age.
        manager
            .create_index(
                Index::create()
                    .table(Orders::Table)
                    .col(Orders::ProjectId)
                    .col(Orders::StatusId)
                    .col(Orders::StatusUpdatedAt)
                    .name("idx_orders_project_status_updated")
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(Orders::Table)
                    .col(Orders::ProjectId)
                    .col(Orders::CreatedAt)
                    .name("idx_orders_project_created_at")
                    .to_owned(),
            )
            .await?;
        // Load counting per operator.
        manager
            .create_index(
                Index::create()
                    .table(Orders::Table)
                    .col(Orders::OperatorId)
                    .name("idx_orders_operator_id")
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(SmsMessages::Table)
                    .col(SmsMessages::Status)
                    .col(SmsMessages::CreatedAt)
                    .name("idx_sms_messages_status_created_at")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "idx_sms_messages_status_created_at",
            "idx_orders_operator_id",
            "idx_orders_project_created_at",
            "idx_orders_project_status_updated",
        ] {
            manager
                .drop_index(Index::drop().name(name).to_owned())
                .await?;
        }
        Ok(())
    }
}

#[derive(Iden)]
enum Orders {
    Table,
    ProjectId,
    StatusId,
    StatusUpdatedAt,
    CreatedAt,
    OperatorId,
}

#[derive(Iden)]
enum SmsMessages {
    Table,
    Status,
    CreatedAt,
}
