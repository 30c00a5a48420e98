//! Data model shared by collectors, the reconciler, and the HTTP API.

mod asset;
mod sync;

pub use asset::{AssetStatus, CollectedDnsRecord, CollectedDomain};
pub use sync::{
    CollectionResult, CollectorKind, MergeStats, SyncRun, SyncRunStatus, SyncStats, TriggerType,
};

/// Error returned when parsing a status/kind label that is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLabel(pub String);

impl std::fmt::Display for UnknownLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown label: {}", self.0)
    }
}

impl std::error::Error for UnknownLabel {}
