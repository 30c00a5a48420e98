use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::sea_query::IndexOrder;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // domains table
        manager
            .create_table(
                Table::create()
                    .table(Domains::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Domains::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Domains::Domain).string().not_null())
                    .col(ColumnDef::new(Domains::Registrar).string().not_null())
                    .col(
                        ColumnDef::new(Domains::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Domains::ExpiryDate).date().null())
                    .col(ColumnDef::new(Domains::DiscoveryDate).date().not_null())
                    .col(ColumnDef::new(Domains::LastSeen).date().not_null())
                    .col(ColumnDef::new(Domains::RawData).json_binary().null())
                    .col(
                        ColumnDef::new(Domains::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Domains::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .unique()
                    .name("uq_domains_domain_registrar")
                    .table(Domains::Table)
                    .col(Domains::Domain)
                    .col(Domains::Registrar)
                    .to_owned(),
            )
            .await?;

        for (name, column) in [
            ("idx_domains_status", Domains::Status),
            ("idx_domains_registrar", Domains::Registrar),
            ("idx_domains_last_seen", Domains::LastSeen),
        ] {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(Domains::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        // dns_records table
        manager
            .create_table(
                Table::create()
                    .table(DnsRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DnsRecords::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DnsRecords::Domain).string().not_null())
                    .col(
                        ColumnDef::new(DnsRecords::Subdomain)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(DnsRecords::RecordType).string().not_null())
                    .col(ColumnDef::new(DnsRecords::Data).text().not_null())
                    .col(ColumnDef::new(DnsRecords::Ttl).integer().null())
                    .col(ColumnDef::new(DnsRecords::Priority).integer().null())
                    .col(ColumnDef::new(DnsRecords::Source).string().not_null())
                    .col(
                        ColumnDef::new(DnsRecords::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(DnsRecords::DiscoveryDate).date().not_null())
                    .col(ColumnDef::new(DnsRecords::LastSeen).date().not_null())
                    .col(ColumnDef::new(DnsRecords::RawData).json_binary().null())
                    .col(
                        ColumnDef::new(DnsRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DnsRecords::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .unique()
                    .name("uq_dns_records_signature")
                    .table(DnsRecords::Table)
                    .col(DnsRecords::Domain)
                    .col(DnsRecords::Subdomain)
                    .col(DnsRecords::RecordType)
                    .col(DnsRecords::Data)
                    .col(DnsRecords::Source)
                    .to_owned(),
            )
            .await?;

        for (name, column) in [
            ("idx_dns_records_domain", DnsRecords::Domain),
            ("idx_dns_records_status", DnsRecords::Status),
            ("idx_dns_records_source", DnsRecords::Source),
            ("idx_dns_records_type", DnsRecords::RecordType),
            ("idx_dns_records_last_seen", DnsRecords::LastSeen),
        ] {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(DnsRecords::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        // sync_runs table
        manager
            .create_table(
                Table::create()
                    .table(SyncRuns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SyncRuns::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SyncRuns::CollectorName).string().not_null())
                    .col(ColumnDef::new(SyncRuns::ServiceType).string().not_null())
                    .col(ColumnDef::new(SyncRuns::Status).string().not_null())
                    .col(ColumnDef::new(SyncRuns::TriggerType).string().not_null())
                    .col(
                        ColumnDef::new(SyncRuns::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SyncRuns::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SyncRuns::RecordsFound)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncRuns::RecordsAdded)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncRuns::RecordsUpdated)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncRuns::RecordsRemoved)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(SyncRuns::ErrorMessage).text().null())
                    .to_owned(),
            )
            .await?;

        for (name, column) in [
            ("idx_sync_runs_collector", SyncRuns::CollectorName),
            ("idx_sync_runs_status", SyncRuns::Status),
        ] {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(SyncRuns::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_sync_runs_started")
                    .table(SyncRuns::Table)
                    .col((SyncRuns::StartedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        // Cross-process lock: at most one running row per collector.
        // sea-query has no partial-index builder; this statement is valid on
        // both SQLite and PostgreSQL.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS uq_sync_runs_running \
                 ON sync_runs (collector_name) WHERE status = 'running'",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SyncRuns::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DnsRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Domains::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden, Clone, Copy)]
enum Domains {
    #[sea_orm(iden = "domains")]
    Table,
    Id,
    Domain,
    Registrar,
    Status,
    ExpiryDate,
    DiscoveryDate,
    LastSeen,
    RawData,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden, Clone, Copy)]
enum DnsRecords {
    #[sea_orm(iden = "dns_records")]
    Table,
    Id,
    Domain,
    Subdomain,
    RecordType,
    Data,
    Ttl,
    Priority,
    Source,
    Status,
    DiscoveryDate,
    LastSeen,
    RawData,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden, Clone, Copy)]
enum SyncRuns {
    #[sea_orm(iden = "sync_runs")]
    Table,
    Id,
    CollectorName,
    ServiceType,
    Status,
    TriggerType,
    StartedAt,
    CompletedAt,
    RecordsFound,
    RecordsAdded,
    RecordsUpdated,
    RecordsRemoved,
    ErrorMessage,
}
