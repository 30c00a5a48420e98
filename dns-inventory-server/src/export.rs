//! Snapshot exporter: projects the current inventory into static JSON files
//! consumed by the dashboard.
//!
//! Files are advisory projections, not transactional with the store: each is
//! written whole, in sequence, and readers tolerate the brief window between
//! replacements.

use std::fs;
use std::path::PathBuf;

use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value, json};

use dns_inventory_core::AssetStatus;

use crate::config::ExportConfig;
use crate::error::ServerResult;
use crate::store::InventoryStore;

/// A removed asset as it appears in `removed.json`.
#[derive(Debug, Serialize)]
struct RemovedAsset {
    asset_type: &'static str,
    name: String,
    provider: String,
    details: String,
    discovery_date: NaiveDate,
    removed_date: NaiveDate,
    status: &'static str,
}

/// Writes inventory snapshots to the JSON output directory.
pub struct ExportService {
    store: InventoryStore,
    output_dir: PathBuf,
}

impl ExportService {
    #[must_use]
    pub fn new(store: InventoryStore, cfg: ExportConfig) -> Self {
        Self {
            store,
            output_dir: cfg.output_dir,
        }
    }

    /// Exports `domains.json`, `subdomains.json`, `removed.json`, and
    /// refreshes `metadata.json`.
    pub async fn export_all(&self) -> ServerResult<()> {
        log::info!("[Export] Starting export to {}", self.output_dir.display());
        fs::create_dir_all(&self.output_dir)?;

        let domains = self.store.get_domains(None, None).await?;
        self.write_json("domains.json", &domains)?;
        log::info!("[Export] Exported {} domains", domains.len());

        let records = self.store.get_dns_records(None, None, None).await?;
        self.write_json("subdomains.json", &records)?;
        log::info!("[Export] Exported {} DNS records", records.len());

        let removed = self.removed_assets().await?;
        self.write_json("removed.json", &removed)?;
        log::info!("[Export] Exported {} removed assets", removed.len());

        self.update_metadata(domains.len(), records.len())?;
        log::info!("[Export] Export complete");
        Ok(())
    }

    /// Exports only `domains.json`.
    pub async fn export_domains(&self) -> ServerResult<()> {
        fs::create_dir_all(&self.output_dir)?;
        let domains = self.store.get_domains(None, None).await?;
        self.write_json("domains.json", &domains)
    }

    /// Exports only `subdomains.json`.
    pub async fn export_dns_records(&self) -> ServerResult<()> {
        fs::create_dir_all(&self.output_dir)?;
        let records = self.store.get_dns_records(None, None, None).await?;
        self.write_json("subdomains.json", &records)
    }

    /// Writes one file whole (no appends), pretty-printed UTF-8.
    fn write_json<T: Serialize>(&self, filename: &str, data: &T) -> ServerResult<()> {
        let path = self.output_dir.join(filename);
        let body = serde_json::to_string_pretty(data)?;
        fs::write(path, body)?;
        Ok(())
    }

    /// Removed domains and DNS records projected into dashboard assets.
    async fn removed_assets(&self) -> ServerResult<Vec<RemovedAsset>> {
        let mut removed = Vec::new();

        for d in self
            .store
            .get_domains(Some(AssetStatus::Removed), None)
            .await?
        {
            removed.push(RemovedAsset {
                asset_type: "domain",
                name: d.domain,
                provider: d.registrar,
                details: "Domain removed from registrar".to_string(),
                discovery_date: d.discovery_date,
                removed_date: d.last_seen,
                status: "removed",
            });
        }

        for r in self
            .store
            .get_dns_records(Some(AssetStatus::Removed), None, None)
            .await?
        {
            let name = if r.subdomain.is_empty() {
                r.domain.clone()
            } else {
                format!("{}.{}", r.subdomain, r.domain)
            };
            removed.push(RemovedAsset {
                asset_type: "subdomain",
                name,
                provider: r.source,
                details: format!("{} record - {}", r.record_type, r.data),
                discovery_date: r.discovery_date,
                removed_date: r.last_seen,
                status: "removed",
            });
        }

        Ok(removed)
    }

    /// Merges the `services.dns` block into `metadata.json`, preserving
    /// unrelated keys.
    fn update_metadata(&self, domain_count: usize, record_count: usize) -> ServerResult<()> {
        let path = self.output_dir.join("metadata.json");

        let mut metadata: Map<String, Value> = fs::read(&path)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default();

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

        let dns_block = json!({
            "name": "DNS",
            "provider": "GoDaddy/Cloudflare",
            "schedule": "daily",
            "last_updated": now,
            "services": {
                "domains": {
                    "last_updated": now,
                    "count": domain_count,
                },
                "subdomains": {
                    "last_updated": now,
                    "count": record_count,
                },
            },
        });

        match metadata
            .entry("services".to_string())
            .or_insert_with(|| json!({}))
        {
            Value::Object(services) => {
                services.insert("dns".to_string(), dns_block);
            }
            other => {
                *other = json!({ "dns": dns_block });
            }
        }
        metadata.insert("last_updated".to_string(), json!(now));

        self.write_json("metadata.json", &metadata)
    }
}
