use sea_orm::entity::prelude::*;

/// Dead-lettered event. Written once per permanent failure, never updated.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "failed_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub event_id: String,
    pub event_type: String,
    pub original_timestamp: chrono::DateTime<chrono::Utc>,
    pub failed_at: chrono::DateTime<chrono::Utc>,
    pub failure_reason: String,
    pub total_retries: i32,
    pub last_status: String,
    pub payload: Json,
    pub service_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
