use sea_orm::entity::prelude::*;

/// Customer order (lead).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub project_id: i32,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub tracking_number: Option<String>,
    /// Minor currency units.
    pub total_amount: i64,
    pub status_id: i32,
    pub operator_id: Option<i32>,
    pub call_attempts: i32,
    pub last_call_result: Option<String>,
    pub next_call_at: Option<chrono::DateTime<chrono::Utc>>,
    pub custom_fields: Json,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub status_updated_at: chrono::DateTime<chrono::Utc>,
    pub approved_at: Option<chrono::DateTime<chrono::Utc>>,
    pub shipped_at: Option<chrono::DateTime<chrono::Utc>>,
    pub canceled_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order_statuses::Entity",
        from = "Column::StatusId",
        to = "super::order_statuses::Column::Id"
    )]
    Status,
    #[sea_orm(
        belongs_to = "super::projects::Entity",
        from = "Column::ProjectId",
        to = "super::projects::Column::Id"
    )]
    Project,
    #[sea_orm(has_many = "super::order_history::Entity")]
    History,
}

impl Related<super::order_statuses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Status.def()
    }
}

impl Related<super::projects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::order_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::History.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
