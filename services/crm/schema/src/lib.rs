pub mod automation_executions;
pub mod automation_rules;
pub mod order_history;
pub mod order_statuses;
pub mod orders;
pub mod outbox_events;
pub mod project_users;
pub mod projects;
pub mod sms_messages;
pub mod sms_templates;
pub mod users;
