use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alerts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Alerts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Alerts::AlertType).string().not_null())
                    .col(
                        ColumnDef::new(Alerts::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alerts::Resolved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Alerts::Detail).text().not_null())
                    .col(ColumnDef::new(Alerts::ResolvedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Alerts::Table)
                    .col(Alerts::AlertType)
                    .col((Alerts::Timestamp, IndexOrder::Desc))
                    .name("idx_alerts_alert_type_timestamp")
                    .to_owned(),
            )
            .await?;
        // Open-alert listing.
        manager
            .create_index(
                Index::create()
                    .table(Alerts::Table)
                    .col(Alerts::Resolved)
                    .col((Alerts::Timestamp, IndexOrder::Desc))
                    .name("idx_alerts_resolved_timestamp")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alerts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Alerts {
    Table,
    Id,
    AlertType,
    Timestamp,
    Resolved,
    Detail,
    ResolvedAt,
}
