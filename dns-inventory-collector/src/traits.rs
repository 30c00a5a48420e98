use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use dns_inventory_core::{CollectionResult, CollectorKind};

use crate::error::Result;

/// The core collector trait.
///
/// A collector normalizes one upstream provider into the shared domain/DNS
/// data model. Implementations are registered once at startup (after
/// [`validate()`](Self::validate) passes) and then driven by the sync
/// orchestrator, which serializes runs per [`name()`](Self::name).
///
/// # Failure-partial semantics
///
/// `collect` returns `Ok` with a partial [`CollectionResult`] when the sweep
/// hit a quota wall after enumerating some domains: the reconciler's scoped
/// tombstone pass interprets the partial set correctly. Credential failures,
/// top-level listing failures, and cancellation return `Err` with nothing
/// collected.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Stable unique identifier, e.g. `"godaddy_dns"`.
    fn name(&self) -> &'static str;

    /// What kind of resources this collector produces.
    fn kind(&self) -> CollectorKind;

    /// Provider label used as the identity key for reconciliation,
    /// e.g. `"GoDaddy"`.
    fn source(&self) -> &'static str;

    /// Checks required credentials/configuration. Called once at
    /// registration; a failing collector is skipped, not fatal.
    fn validate(&self) -> Result<()>;

    /// Performs one full sweep of the provider.
    ///
    /// Implementations must observe `cancel` between requests and between
    /// pages.
    async fn collect(&self, cancel: &CancellationToken) -> Result<CollectionResult>;
}
