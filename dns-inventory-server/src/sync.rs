//! Sync service: runs one collector end-to-end and merges its output.

use std::collections::BTreeSet;

use tokio_util::sync::CancellationToken;

use dns_inventory_collector::Collector;
use dns_inventory_core::SyncStats;

use crate::error::ServerError;
use crate::merger::Merger;
use crate::store::InventoryStore;

/// What one sync attempt produced.
///
/// `stats` carries whatever counts accumulated before a failure, so a run
/// that collected and merged domains but failed on the record merge still
/// records its partial progress in the sync run row.
pub struct SyncOutcome {
    pub stats: SyncStats,
    pub error: Option<ServerError>,
}

impl SyncOutcome {
    fn failed(stats: SyncStats, error: ServerError) -> Self {
        Self {
            stats,
            error: Some(error),
        }
    }
}

/// Orchestrates collect → merge for a single collector run.
pub struct SyncService {
    merger: Merger,
}

impl SyncService {
    #[must_use]
    pub fn new(store: &InventoryStore) -> Self {
        Self {
            merger: Merger::new(store.connection().clone()),
        }
    }

    /// Runs a collector sweep and reconciles the result.
    ///
    /// Locking is the caller's concern; this only collects and merges.
    pub async fn run_collector(
        &self,
        collector: &dyn Collector,
        cancel: &CancellationToken,
    ) -> SyncOutcome {
        log::info!("[Sync] Starting collector: {}", collector.name());

        let result = match collector.collect(cancel).await {
            Ok(result) => result,
            Err(e) => return SyncOutcome::failed(SyncStats::default(), e.into()),
        };

        let mut stats = SyncStats {
            found: result.found() as u64,
            ..SyncStats::default()
        };

        if !result.domains.is_empty() {
            log::info!(
                "[Sync] Merging {} domains from {}",
                result.domains.len(),
                collector.source()
            );
            match self
                .merger
                .merge_domains(collector.source(), &result.domains, cancel)
                .await
            {
                Ok(merge) => {
                    stats.absorb(merge);
                    log::info!(
                        "[Sync] Domains: added={} updated={} removed={}",
                        merge.added,
                        merge.updated,
                        merge.removed
                    );
                }
                Err(e) => return SyncOutcome::failed(stats, e),
            }
        }

        // Tombstoning scope: parents present in the batch plus parents the
        // collector fully swept (a checked domain with zero records still
        // gets its stale rows tombstoned).
        let observed: Vec<String> = result
            .swept_domains
            .iter()
            .cloned()
            .chain(result.dns_records.iter().map(|r| r.domain.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if !result.dns_records.is_empty() || !observed.is_empty() {
            log::info!(
                "[Sync] Merging {} DNS records from {} ({} domains checked)",
                result.dns_records.len(),
                collector.source(),
                observed.len()
            );
            match self
                .merger
                .merge_dns_records_scoped(
                    collector.source(),
                    &result.dns_records,
                    &observed,
                    chrono::Utc::now().date_naive(),
                    cancel,
                )
                .await
            {
                Ok(merge) => {
                    stats.absorb(merge);
                    log::info!(
                        "[Sync] DNS records: added={} updated={} removed={}",
                        merge.added,
                        merge.updated,
                        merge.removed
                    );
                }
                Err(e) => return SyncOutcome::failed(stats, e),
            }
        }

        log::info!(
            "[Sync] Collector {} complete: found={} added={} updated={} removed={}",
            collector.name(),
            stats.found,
            stats.added,
            stats.updated,
            stats.removed
        );

        SyncOutcome {
            stats,
            error: None,
        }
    }
}
