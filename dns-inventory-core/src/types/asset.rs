use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::UnknownLabel;

/// Lifecycle state of an inventoried asset.
///
/// `Active` means the asset was present in the most recent successful sweep
/// of its source; `Removed` means the sweep no longer returned it (the row is
/// kept as a tombstone, never deleted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    Active,
    Removed,
}

impl AssetStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Removed => "removed",
        }
    }
}

impl std::fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AssetStatus {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "removed" => Ok(Self::Removed),
            other => Err(UnknownLabel(other.to_string())),
        }
    }
}

/// A registered domain as reported by one upstream sweep.
///
/// Identity within the inventory is `(name, registrar)`. Provenance dates
/// (`discovery_date`, `last_seen`) are owned by the reconciler, not the
/// collector, so they do not appear here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectedDomain {
    pub name: String,
    /// Provider label used as the identity key for reconciliation
    /// (e.g. "GoDaddy"). Stored in the `registrar` column.
    pub registrar: String,
    /// Expiry date reported by the registrar, if any.
    pub expiry_date: Option<NaiveDate>,
    /// The provider's original JSON object, stored verbatim and never
    /// compared on.
    pub raw: Option<Value>,
}

/// A DNS record as reported by one upstream sweep.
///
/// Identity is the full signature `(domain, subdomain, record_type, data,
/// source)`; equal signatures denote the same logical record. `subdomain` is
/// the empty string for the apex.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectedDnsRecord {
    /// Parent zone name.
    pub domain: String,
    pub subdomain: String,
    /// Normalized (uppercase, trimmed) record type.
    pub record_type: String,
    pub data: String,
    pub ttl: Option<i32>,
    pub priority: Option<i32>,
    /// Provider label, same role as [`CollectedDomain::registrar`].
    pub source: String,
    pub raw: Option<Value>,
}
