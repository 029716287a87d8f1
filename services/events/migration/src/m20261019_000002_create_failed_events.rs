use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FailedEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FailedEvents::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    // One dead-letter row per event: capture is idempotent on this key.
                    .col(
                        ColumnDef::new(FailedEvents::EventId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(FailedEvents::EventType).string().not_null())
                    .col(
                        ColumnDef::new(FailedEvents::OriginalTimestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FailedEvents::FailedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FailedEvents::FailureReason).text().not_null())
                    .col(
                        ColumnDef::new(FailedEvents::TotalRetries)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(FailedEvents::LastStatus).string_len(16).not_null())
                    .col(ColumnDef::new(FailedEvents::Payload).json_binary().not_null())
                    .col(ColumnDef::new(FailedEvents::ServiceName).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(FailedEvents::Table)
                    .col((FailedEvents::OriginalTimestamp, IndexOrder::Desc))
                    .name("idx_failed_events_original_timestamp")
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(FailedEvents::Table)
                    .col(FailedEvents::FailureReason)
                    .name("idx_failed_events_failure_reason")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FailedEvents::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum FailedEvents {
    Table,
    Id,
    EventId,
    EventType,
    OriginalTimestamp,
    FailedAt,
    FailureReason,
    TotalRetries,
    LastStatus,
    Payload,
    ServiceName,
}
