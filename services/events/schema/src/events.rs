use sea_orm::entity::prelude::*;

/// Submitted event and its current processing status.
///
/// `status` holds one of `PENDING`, `PROCESSING`, `COMPLETED`, `FAILED`
/// (enforced by a CHECK constraint); `retry_count` is never negative.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub event_id: String,
    pub event_type: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub payload: Json,
    pub status: String,
    pub retry_count: i32,
    pub metadata: Option<Json>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub processed_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
