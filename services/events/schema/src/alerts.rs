use sea_orm::entity::prelude::*;

/// Operational alert. Only `resolved`/`resolved_at` ever change, once.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "alerts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub alert_type: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub resolved: bool,
    pub detail: String,
    pub resolved_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
