use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const STATUSES: [&str; 4] = ["PENDING", "PROCESSING", "COMPLETED", "FAILED"];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Events::Table)
                    .if_not_exists()
                    // Primary key doubles as the unique event_id index.
                    .col(
                        ColumnDef::new(Events::EventId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Events::EventType).string().not_null())
                    .col(
                        ColumnDef::new(Events::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Events::Payload).json_binary().not_null())
                    .col(
                        ColumnDef::new(Events::Status)
                            .string_len(16)
                            .not_null()
                            .default("PENDING")
                            .check(Expr::col(Events::Status).is_in(STATUSES)),
                    )
                    .col(
                        ColumnDef::new(Events::RetryCount)
                            .integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Events::RetryCount).gte(0)),
                    )
                    .col(ColumnDef::new(Events::Metadata).json_binary())
                    .col(
                        ColumnDef::new(Events::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Events::ProcessedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Filtered listings by type and by status, newest first.
        manager
            .create_index(
                Index::create()
                    .table(Events::Table)
                    .col(Events::EventType)
                    .col((Events::Timestamp, IndexOrder::Desc))
                    .name("idx_events_event_type_timestamp")
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(Events::Table)
                    .col(Events::Status)
                    .col((Events::Timestamp, IndexOrder::Desc))
                    .name("idx_events_status_timestamp")
                    .to_owned(),
            )
            .await?;
        // Recent-events listing.
        manager
            .create_index(
                Index::create()
                    .table(Events::Table)
                    .col((Events::Timestamp, IndexOrder::Desc))
                    .name("idx_events_timestamp")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Events::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Events {
    Table,
    EventId,
    EventType,
    Timestamp,
    Payload,
    Status,
    RetryCount,
    Metadata,
    UpdatedAt,
    ProcessedAt,
}
