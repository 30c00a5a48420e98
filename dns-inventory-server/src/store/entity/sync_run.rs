use sea_orm::entity::prelude::*;

/// Persisted trace of one collector execution.
///
/// Rows are inserted on lock acquire, finalized once on release, and never
/// deleted. A partial unique index on `(collector_name) WHERE status =
/// 'running'` enforces at-most-one running run per collector.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sync_runs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub collector_name: String,
    pub service_type: String,
    pub status: String,
    pub trigger_type: String,
    pub started_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
    pub records_found: i32,
    pub records_added: i32,
    pub records_updated: i32,
    pub records_removed: i32,
    pub error_message: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
