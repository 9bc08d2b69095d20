use sea_orm_migration::prelude::*;

mod m20250301_000001_create_projects_and_users;
mod m20250301_000002_create_order_statuses;
mod m20250301_000003_create_orders;
mod m20250301_000004_create_order_history;
mod m20250301_000005_create_automation_rules;
mod m20250301_000006_create_automation_executions;
mod m20250301_000007_create_sms_tables;
mod m20250301_000008_create_outbox_events;
mod m20250301_000009_add_engine_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_projects_and_users::Migration),
            Box::new(m20250301_000002_create_order_statuses::Migration),
            Box::new(m20250301_000003_create_orders::Migration),
            Box::new(m20250301_000004_create_order_history::Migration),
            Box::new(m20250301_000005_create_automation_rules::Migration),
            Box::new(m20250301_000006_create_automation_executions::Migration),
            Box::new(m20250301_000007_create_sms_tables::Migration),
            Box::new(m20250301_000008_create_outbox_events::Migration),
            Box::new(m20250301_000009_add_engine_indexes::Migration),
        ]
    }
}
