use sea_orm::entity::prelude::*;

/// Outbound SMS. Rows start `pending` and are drained by the dispatch job.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sms_messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub project_id: i32,
    pub order_id: Option<i32>,
    pub template_id: Option<i32>,
    pub phone_number: String,
    pub content: String,
    /// "pending" | "processing" | "sent" | "failed"
    pub status: String,
    pub provider: Option<String>,
    pub external_id: Option<String>,
    pub error_message: Option<String>,
    pub sent_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
