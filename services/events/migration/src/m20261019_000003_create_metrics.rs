use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Metrics::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Metrics::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Metrics::MetricName).string().not_null())
                    .col(
                        ColumnDef::new(Metrics::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Metrics::Value).json_binary().not_null())
                    .col(
                        ColumnDef::new(Metrics::Unit)
                            .string_len(32)
                            .not_null()
                            .default("COUNT"),
                    )
                    .to_owned(),
            )
            .await?;

        // Name + time-range queries.
        manager
            .create_index(
                Index::create()
                    .table(Metrics::Table)
                    .col(Metrics::MetricName)
                    .col((Metrics::Timestamp, IndexOrder::Desc))
                    .name("idx_metrics_metric_name_timestamp")
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(Metrics::Table)
                    .col((Metrics::Timestamp, IndexOrder::Desc))
                    .name("idx_metrics_timestamp")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Metrics::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Metrics {
    Table,
    Id,
    MetricName,
    Timestamp,
    Value,
    Unit,
}
