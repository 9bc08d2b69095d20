use sea_orm::entity::prelude::*;

/// User account. Operators are users with a project membership.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    pub name: String,
    /// "active" | "blocked"
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::project_users::Entity")]
    ProjectUsers,
}

impl Related<super::project_users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProjectUsers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
