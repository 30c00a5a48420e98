use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CollectedDnsRecord, CollectedDomain, UnknownLabel};

/// What kind of resources a collector produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectorKind {
    /// Registered domain inventory.
    Domains,
    /// DNS records (subdomains).
    DnsRecords,
}

impl CollectorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Domains => "domains",
            Self::DnsRecords => "dns_records",
        }
    }
}

impl std::fmt::Display for CollectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CollectorKind {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "domains" => Ok(Self::Domains),
            "dns_records" => Ok(Self::DnsRecords),
            other => Err(UnknownLabel(other.to_string())),
        }
    }
}

/// How a sync run was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerType {
    Scheduled,
    Manual,
}

impl TriggerType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TriggerType {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "manual" => Ok(Self::Manual),
            other => Err(UnknownLabel(other.to_string())),
        }
    }
}

/// State of a persisted sync run.
///
/// At most one run per collector name is `Running` at any instant; the store
/// enforces this with a partial unique index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncRunStatus {
    Running,
    Completed,
    Failed,
}

impl SyncRunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SyncRunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SyncRunStatus {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(UnknownLabel(other.to_string())),
        }
    }
}

/// Everything one collector sweep produced.
#[derive(Debug, Clone, Default)]
pub struct CollectionResult {
    pub domains: Vec<CollectedDomain>,
    pub dns_records: Vec<CollectedDnsRecord>,
    /// Parent domains whose record enumeration completed this sweep,
    /// including those that turned out to have zero records. The reconciler
    /// tombstones only within this set; domains skipped by quota exhaustion
    /// or per-domain errors stay out and are left untouched.
    pub swept_domains: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl CollectionResult {
    /// Start a new result stamped with the current time.
    #[must_use]
    pub fn begin() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Stamp the end of the sweep.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Total number of collected items.
    #[must_use]
    pub fn found(&self) -> usize {
        self.domains.len() + self.dns_records.len()
    }

    /// Wall-clock duration of the sweep, if both stamps are set.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

/// Outcome counters of one reconciliation call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub added: u64,
    pub updated: u64,
    pub removed: u64,
}

/// Aggregate counters for a whole sync run (both merge phases).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub found: u64,
    pub added: u64,
    pub updated: u64,
    pub removed: u64,
}

impl SyncStats {
    /// Fold one merge phase's counters into the run totals.
    pub fn absorb(&mut self, merge: MergeStats) {
        self.added += merge.added;
        self.updated += merge.updated;
        self.removed += merge.removed;
    }
}

/// Persisted trace of one collector execution; also the locking primitive.
#[derive(Debug, Clone, Serialize)]
pub struct SyncRun {
    pub id: String,
    pub collector_name: String,
    pub service_type: CollectorKind,
    pub status: SyncRunStatus,
    pub trigger_type: TriggerType,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub records_found: i32,
    pub records_added: i32,
    pub records_updated: i32,
    pub records_removed: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}
