//! Two-layer sync lock: a per-collector in-process mutex plus the
//! `sync_runs` table for cross-process exclusion.
//!
//! Acquire order: take the in-process permit non-blockingly, check the
//! database for a running row (another instance may hold one), then insert
//! the new running row. The partial unique index on `(collector_name) WHERE
//! status = 'running'` backstops the race between check and insert; a
//! violating insert is treated as not-acquired, never as an error.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, SqlErr,
};
use sea_orm::sea_query::Expr;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use dns_inventory_core::{CollectorKind, SyncRun, SyncRunStatus, SyncStats, TriggerType};

use crate::error::{ServerError, ServerResult};
use crate::store::entity::sync_run;

/// Message recorded on runs orphaned by a crashed process.
const STALE_LOCK_MESSAGE: &str = "Process terminated unexpectedly";

/// Proof of an acquired sync lock.
///
/// Holds the in-process permit; dropping it (on any exit path, including a
/// panic unwinding through the orchestrator) frees the in-process layer.
/// The database row is finalized by [`SyncLock::release`]; a row left
/// `running` by a crash is recovered by [`SyncLock::cleanup_stale`].
pub struct SyncGuard {
    run_id: String,
    collector_name: String,
    _permit: OwnedMutexGuard<()>,
}

impl SyncGuard {
    /// Id of the sync run row created at acquire time.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    #[must_use]
    pub fn collector_name(&self) -> &str {
        &self.collector_name
    }
}

/// Manages exclusive access for sync operations.
pub struct SyncLock {
    db: DatabaseConnection,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SyncLock {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The per-name mutex, lazily created.
    fn slot(&self, collector_name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(collector_name.to_string()).or_default().clone()
    }

    /// Attempts to acquire the lock for a collector.
    ///
    /// Returns `Ok(None)` when the collector is already running, in this
    /// process or any other sharing the database. On success a `running`
    /// sync run row has been inserted.
    pub async fn try_acquire(
        &self,
        collector_name: &str,
        service_type: CollectorKind,
        trigger_type: TriggerType,
    ) -> ServerResult<Option<SyncGuard>> {
        let Ok(permit) = self.slot(collector_name).try_lock_owned() else {
            return Ok(None);
        };

        let running = sync_run::Entity::find()
            .filter(sync_run::Column::CollectorName.eq(collector_name))
            .filter(sync_run::Column::Status.eq(SyncRunStatus::Running.as_str()))
            .one(&self.db)
            .await?;
        if running.is_some() {
            // Another instance holds the lock; the permit drops here.
            return Ok(None);
        }

        let run_id = Uuid::new_v4().to_string();
        let row = sync_run::ActiveModel {
            id: Set(run_id.clone()),
            collector_name: Set(collector_name.to_string()),
            service_type: Set(service_type.as_str().to_string()),
            status: Set(SyncRunStatus::Running.as_str().to_string()),
            trigger_type: Set(trigger_type.as_str().to_string()),
            started_at: Set(Utc::now()),
            completed_at: Set(None),
            records_found: Set(0),
            records_added: Set(0),
            records_updated: Set(0),
            records_removed: Set(0),
            error_message: Set(None),
        };

        match sync_run::Entity::insert(row).exec(&self.db).await {
            Ok(_) => Ok(Some(SyncGuard {
                run_id,
                collector_name: collector_name.to_string(),
                _permit: permit,
            })),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Finalizes the sync run row and releases the in-process permit.
    ///
    /// `error` of `None` records `completed`; otherwise `failed` with the
    /// message.
    pub async fn release(
        &self,
        guard: SyncGuard,
        stats: &SyncStats,
        error: Option<&str>,
    ) -> ServerResult<()> {
        let status = if error.is_none() {
            SyncRunStatus::Completed
        } else {
            SyncRunStatus::Failed
        };

        let update = sync_run::ActiveModel {
            id: Set(guard.run_id.clone()),
            status: Set(status.as_str().to_string()),
            completed_at: Set(Some(Utc::now())),
            records_found: Set(clamp_count(stats.found)),
            records_added: Set(clamp_count(stats.added)),
            records_updated: Set(clamp_count(stats.updated)),
            records_removed: Set(clamp_count(stats.removed)),
            error_message: Set(error.map(str::to_string)),
            ..Default::default()
        };

        let result = sync_run::Entity::update(update).exec(&self.db).await;
        drop(guard);
        result?;
        Ok(())
    }

    /// Whether a collector currently has a running sync.
    pub async fn is_running(&self, collector_name: &str) -> ServerResult<bool> {
        let count = sync_run::Entity::find()
            .filter(sync_run::Column::CollectorName.eq(collector_name))
            .filter(sync_run::Column::Status.eq(SyncRunStatus::Running.as_str()))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    /// Most recent sync run for a collector, if any.
    pub async fn latest_run(&self, collector_name: &str) -> ServerResult<Option<SyncRun>> {
        let row = sync_run::Entity::find()
            .filter(sync_run::Column::CollectorName.eq(collector_name))
            .order_by_desc(sync_run::Column::StartedAt)
            .one(&self.db)
            .await?;

        row.map(run_from_model).transpose()
    }

    /// Latest sync run per collector name, ordered by name.
    pub async fn all_latest(&self) -> ServerResult<Vec<SyncRun>> {
        let mut names: Vec<String> = sync_run::Entity::find()
            .select_only()
            .column(sync_run::Column::CollectorName)
            .distinct()
            .into_tuple()
            .all(&self.db)
            .await?;
        names.sort();

        let mut runs = Vec::with_capacity(names.len());
        for name in names {
            if let Some(run) = self.latest_run(&name).await? {
                runs.push(run);
            }
        }
        Ok(runs)
    }

    /// Marks runs stuck in `running` older than `max_age` as failed.
    ///
    /// Runs once at scheduler startup; a crashed predecessor otherwise pins
    /// its collector forever.
    pub async fn cleanup_stale(&self, max_age: chrono::Duration) -> ServerResult<u64> {
        let cutoff = Utc::now() - max_age;

        let result = sync_run::Entity::update_many()
            .col_expr(
                sync_run::Column::Status,
                Expr::value(SyncRunStatus::Failed.as_str()),
            )
            .col_expr(sync_run::Column::CompletedAt, Expr::value(Utc::now()))
            .col_expr(sync_run::Column::ErrorMessage, Expr::value(STALE_LOCK_MESSAGE))
            .filter(sync_run::Column::Status.eq(SyncRunStatus::Running.as_str()))
            .filter(sync_run::Column::StartedAt.lt(cutoff))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }
}

fn clamp_count(value: u64) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Decodes a stored row into the shared [`SyncRun`] type.
pub(crate) fn run_from_model(model: sync_run::Model) -> ServerResult<SyncRun> {
    let service_type = model
        .service_type
        .parse()
        .map_err(|e| ServerError::CorruptRow(format!("sync run service_type: {e}")))?;
    let status = model
        .status
        .parse()
        .map_err(|e| ServerError::CorruptRow(format!("sync run status: {e}")))?;
    let trigger_type = model
        .trigger_type
        .parse()
        .map_err(|e| ServerError::CorruptRow(format!("sync run trigger_type: {e}")))?;

    Ok(SyncRun {
        id: model.id,
        collector_name: model.collector_name,
        service_type,
        status,
        trigger_type,
        started_at: model.started_at,
        completed_at: model.completed_at,
        records_found: model.records_found,
        records_added: model.records_added,
        records_updated: model.records_updated,
        records_removed: model.records_removed,
        error_message: model.error_message,
    })
}
