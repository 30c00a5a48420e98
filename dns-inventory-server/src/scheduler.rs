//! Cron-driven and on-demand invocation of collector syncs.
//!
//! A cron tick never blocks on an already-running collector: the lock
//! manager's non-blocking acquire drops the tick silently. On-demand
//! triggers spawn a background task that is serialized by the same lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;

use dns_inventory_collector::{Collector, CollectorRegistry};
use dns_inventory_core::{CollectorKind, SyncRun, SyncStats, TriggerType};

use crate::config::SchedulerConfig;
use crate::error::{ServerError, ServerResult};
use crate::export::ExportService;
use crate::lock::SyncLock;
use crate::sync::{SyncOutcome, SyncService};

/// Sync runs wedged in `running` longer than this are presumed orphaned by
/// a crashed process.
const STALE_LOCK_MAX_AGE_HOURS: i64 = 2;

/// One scheduled cron entry, as reported by `GET /scheduler/jobs`.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledJob {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_run: Option<DateTime<Utc>>,
}

struct JobEntry {
    job_id: uuid::Uuid,
    prev_run: Option<DateTime<Utc>>,
}

/// Manages scheduled and on-demand sync jobs.
pub struct Scheduler {
    registry: Arc<CollectorRegistry>,
    sync: Arc<SyncService>,
    export: Arc<ExportService>,
    lock: Arc<SyncLock>,
    cfg: SchedulerConfig,
    cancel: CancellationToken,
    engine: tokio::sync::Mutex<Option<JobScheduler>>,
    jobs: Mutex<HashMap<String, JobEntry>>,
}

impl Scheduler {
    #[must_use]
    pub fn new(
        registry: Arc<CollectorRegistry>,
        sync: Arc<SyncService>,
        export: Arc<ExportService>,
        lock: Arc<SyncLock>,
        cfg: SchedulerConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            registry,
            sync,
            export,
            lock,
            cfg,
            cancel,
            engine: tokio::sync::Mutex::new(None),
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Runs stale-lock recovery, registers cron entries, and blocks until
    /// the cancellation token fires.
    ///
    /// When scheduling is disabled, recovery still runs and the call returns
    /// immediately.
    pub async fn start(self: &Arc<Self>) -> ServerResult<()> {
        match self
            .lock
            .cleanup_stale(chrono::Duration::hours(STALE_LOCK_MAX_AGE_HOURS))
            .await
        {
            Ok(0) => {}
            Ok(recovered) => {
                log::info!("[Scheduler] Cleaned up {recovered} stale sync records");
            }
            Err(e) => log::warn!("[Scheduler] Failed to clean up stale locks: {e}"),
        }

        if !self.cfg.enabled {
            log::info!("[Scheduler] Scheduler disabled");
            return Ok(());
        }

        let engine = JobScheduler::new().await?;

        if !self.cfg.dns_cron.is_empty() {
            for collector in self.registry.by_kind(CollectorKind::DnsRecords) {
                if let Err(e) = self
                    .schedule_collector(&engine, collector.clone(), &self.cfg.dns_cron)
                    .await
                {
                    log::warn!("[Scheduler] Failed to schedule {}: {e}", collector.name());
                }
            }
        }

        if !self.cfg.domains_cron.is_empty() && self.cfg.domains_cron != self.cfg.dns_cron {
            for collector in self.registry.by_kind(CollectorKind::Domains) {
                if let Err(e) = self
                    .schedule_collector(&engine, collector.clone(), &self.cfg.domains_cron)
                    .await
                {
                    log::warn!("[Scheduler] Failed to schedule {}: {e}", collector.name());
                }
            }
        }

        engine.start().await?;
        *self.engine.lock().await = Some(engine);

        let names: Vec<String> = {
            let jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
            jobs.keys().cloned().collect()
        };
        log::info!("[Scheduler] Started with {} scheduled jobs", names.len());
        for name in names {
            if let Ok(Some(next)) = self.next_run(&name).await {
                log::info!("[Scheduler] {name}: next run at {next}");
            }
        }

        self.cancel.cancelled().await;

        log::info!("[Scheduler] Stopping...");
        if let Some(mut engine) = self.engine.lock().await.take() {
            if let Err(e) = engine.shutdown().await {
                log::warn!("[Scheduler] Cron engine shutdown error: {e}");
            }
        }
        log::info!("[Scheduler] Stopped");
        Ok(())
    }

    /// Registers one cron entry bound to a collector.
    async fn schedule_collector(
        self: &Arc<Self>,
        engine: &JobScheduler,
        collector: Arc<dyn Collector>,
        cron_expr: &str,
    ) -> ServerResult<()> {
        let name = collector.name().to_string();
        {
            let jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
            if jobs.contains_key(&name) {
                return Err(ServerError::Scheduler(format!(
                    "collector {name} already scheduled"
                )));
            }
        }

        let expression = normalize_cron(cron_expr);
        let this = Arc::clone(self);
        let job_collector = Arc::clone(&collector);
        let job = Job::new_async(expression.as_str(), move |_job_id, _engine| {
            let this = Arc::clone(&this);
            let collector = Arc::clone(&job_collector);
            Box::pin(async move {
                this.note_fired(collector.name());
                this.run_collector(collector, TriggerType::Scheduled).await;
            })
        })?;

        let job_id = engine.add(job).await?;
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), JobEntry { job_id, prev_run: None });

        log::info!("[Scheduler] Scheduled {name} with cron: {cron_expr}");
        Ok(())
    }

    fn note_fired(&self, name: &str) {
        let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = jobs.get_mut(name) {
            entry.prev_run = Some(Utc::now());
        }
    }

    /// Runs one collector under the sync lock and finalizes its run record.
    ///
    /// Exporter failure is logged but does not mark the sync failed.
    pub async fn run_collector(self: Arc<Self>, collector: Arc<dyn Collector>, trigger: TriggerType) {
        let guard = match self
            .lock
            .try_acquire(collector.name(), collector.kind(), trigger)
            .await
        {
            Ok(Some(guard)) => guard,
            Ok(None) => {
                log::info!("[Scheduler] Skipping {} - already running", collector.name());
                return;
            }
            Err(e) => {
                log::error!(
                    "[Scheduler] Failed to acquire lock for {}: {e}",
                    collector.name()
                );
                return;
            }
        };

        log::info!(
            "[Scheduler] Starting {} sync (trigger: {trigger})",
            collector.name()
        );

        // The run record must be finalized even if the sync panics.
        let outcome = std::panic::AssertUnwindSafe(
            self.sync.run_collector(collector.as_ref(), &self.cancel),
        )
        .catch_unwind()
        .await;

        let (stats, error) = match outcome {
            Ok(SyncOutcome { stats, error }) => (stats, error),
            Err(_) => (
                SyncStats::default(),
                Some(ServerError::Scheduler("sync task panicked".to_string())),
            ),
        };

        let error_message = error.as_ref().map(ToString::to_string);
        if let Err(e) = self
            .lock
            .release(guard, &stats, error_message.as_deref())
            .await
        {
            log::error!(
                "[Scheduler] Failed to release lock for {}: {e}",
                collector.name()
            );
        }

        if let Some(e) = &error {
            log::error!("[Scheduler] Sync {} failed: {e}", collector.name());
            return;
        }

        log::info!(
            "[Scheduler] Sync {} completed: found={} added={} updated={} removed={}",
            collector.name(),
            stats.found,
            stats.added,
            stats.updated,
            stats.removed
        );

        if let Err(e) = self.export.export_all().await {
            log::error!("[Scheduler] Export failed after {} sync: {e}", collector.name());
        }
    }

    /// Spawns a manual sync for one collector; returns after spawning.
    pub fn trigger_sync(self: &Arc<Self>, name: &str) -> ServerResult<()> {
        let Some(collector) = self.registry.get(name) else {
            return Err(ServerError::CollectorNotFound(name.to_string()));
        };

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run_collector(collector, TriggerType::Manual).await;
        });
        Ok(())
    }

    /// Spawns a manual sync for every registered collector.
    pub fn trigger_sync_all(self: &Arc<Self>) -> ServerResult<usize> {
        let collectors = self.registry.all();
        if collectors.is_empty() {
            return Err(ServerError::NoCollectors);
        }

        let spawned = collectors.len();
        for collector in collectors {
            let this = Arc::clone(self);
            tokio::spawn(async move {
                this.run_collector(collector, TriggerType::Manual).await;
            });
        }
        Ok(spawned)
    }

    /// Next cron fire time for a collector, if it is scheduled.
    pub async fn next_run(&self, name: &str) -> ServerResult<Option<DateTime<Utc>>> {
        let job_id = {
            let jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
            jobs.get(name).map(|entry| entry.job_id)
        };
        let Some(job_id) = job_id else {
            return Ok(None);
        };

        let mut engine = self.engine.lock().await;
        let Some(engine) = engine.as_mut() else {
            return Ok(None);
        };
        Ok(engine.next_tick_for_job(job_id).await?)
    }

    /// All scheduled jobs with next/previous fire times, ordered by name.
    pub async fn scheduled_jobs(&self) -> Vec<ScheduledJob> {
        let entries: Vec<(String, uuid::Uuid, Option<DateTime<Utc>>)> = {
            let jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
            jobs.iter()
                .map(|(name, entry)| (name.clone(), entry.job_id, entry.prev_run))
                .collect()
        };

        let mut engine = self.engine.lock().await;
        let mut scheduled = Vec::with_capacity(entries.len());
        for (name, job_id, prev_run) in entries {
            let next_run = match engine.as_mut() {
                Some(engine) => engine.next_tick_for_job(job_id).await.ok().flatten(),
                None => None,
            };
            scheduled.push(ScheduledJob {
                name,
                next_run,
                prev_run,
            });
        }
        scheduled.sort_by(|a, b| a.name.cmp(&b.name));
        scheduled
    }

    /// Whether a collector currently has a running sync.
    pub async fn is_running(&self, name: &str) -> ServerResult<bool> {
        self.lock.is_running(name).await
    }

    /// Most recent sync run for a collector.
    pub async fn latest_run(&self, name: &str) -> ServerResult<Option<SyncRun>> {
        self.lock.latest_run(name).await
    }

    /// Latest sync run per collector.
    pub async fn all_latest(&self) -> ServerResult<Vec<SyncRun>> {
        self.lock.all_latest().await
    }
}

/// Normalizes a 5-field cron expression to the 6-field (with seconds) form
/// the cron engine expects. Expressions already carrying a seconds field
/// pass through unchanged.
fn normalize_cron(expr: &str) -> String {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() == 5 {
        format!("0 {}", fields.join(" "))
    } else {
        fields.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_field_cron_gains_seconds() {
        assert_eq!(normalize_cron("0 6 * * *"), "0 0 6 * * *");
        assert_eq!(normalize_cron("0 0 * * 0"), "0 0 0 * * 0");
    }

    #[test]
    fn six_field_cron_passes_through() {
        assert_eq!(normalize_cron("30 0 6 * * *"), "30 0 6 * * *");
    }

    #[test]
    fn surrounding_whitespace_is_normalized() {
        assert_eq!(normalize_cron("  */5  *  * * *  "), "0 */5 * * * *");
    }
}
