//! DNS Asset Inventory core library.
//!
//! Shared vocabulary for the collection-and-reconciliation pipeline:
//! - Normalized collector output ([`CollectedDomain`], [`CollectedDnsRecord`])
//! - Sync run bookkeeping ([`SyncRun`], [`MergeStats`], [`SyncStats`])
//! - Discovery filters and hostname normalization ([`naming`])
//!
//! This crate is storage- and transport-agnostic; the collector and server
//! crates build on it.

pub mod naming;
pub mod types;

pub use types::{
    AssetStatus, CollectedDnsRecord, CollectedDomain, CollectionResult, CollectorKind, MergeStats,
    SyncRun, SyncRunStatus, SyncStats, TriggerType, UnknownLabel,
};
