use sea_orm::entity::prelude::*;

/// Tenant. Every other record is scoped to one project.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::orders::Entity")]
    Orders,
    #[sea_orm(has_many = "super::order_statuses::Entity")]
    OrderStatuses,
    #[sea_orm(has_many = "super::automation_rules::Entity")]
    AutomationRules,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::order_statuses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderStatuses.def()
    }
}

impl Related<super::automation_rules::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AutomationRules.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
