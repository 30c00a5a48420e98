//! Cloudflare DNS provider collector.
//!
//! Verifies the API token via a lightweight endpoint, then enumerates zones
//! and per-zone DNS records with 1-based page pagination. A verification
//! failure aborts the sweep with no partial state.

mod types;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use dns_inventory_core::naming;
use dns_inventory_core::{CollectedDnsRecord, CollectedDomain, CollectionResult, CollectorKind};

use crate::error::{CollectorError, FetchError, Result};
use crate::fetch::{FetchClient, RetryPolicy};
use crate::traits::Collector;

use types::{CloudflareResponse, CloudflareZone};

pub(crate) const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

const SOURCE: &str = "Cloudflare";
const PROGRESS_INTERVAL: usize = 20;

/// Configuration for [`CloudflareCollector`], filled from `CLOUDFLARE_*`
/// environment variables.
#[derive(Debug, Clone)]
pub struct CloudflareConfig {
    pub api_token: String,
    pub base_url: String,
    pub zones_per_page: usize,
    pub records_per_page: usize,
}

impl Default for CloudflareConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            base_url: CLOUDFLARE_API_BASE.to_string(),
            zones_per_page: 50,
            records_per_page: 1000,
        }
    }
}

impl CloudflareConfig {
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.api_token.is_empty()
    }
}

/// Collector for zones and DNS records hosted at Cloudflare.
pub struct CloudflareCollector {
    cfg: CloudflareConfig,
    client: FetchClient,
}

impl CloudflareCollector {
    #[must_use]
    pub fn new(cfg: CloudflareConfig, policy: RetryPolicy) -> Self {
        Self {
            cfg,
            client: FetchClient::new(policy),
        }
    }

    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", self.cfg.api_token)) {
            headers.insert(AUTHORIZATION, value);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    /// GETs a path and decodes the Cloudflare response envelope.
    async fn get_envelope<T: for<'de> serde::Deserialize<'de>>(
        &self,
        url: &str,
        what: &str,
        cancel: &CancellationToken,
    ) -> Result<CloudflareResponse<T>> {
        let body = self.client.get(url, self.auth_headers(), cancel).await?;
        let response: CloudflareResponse<T> =
            serde_json::from_str(&body).map_err(|e| CollectorError::InvalidResponse {
                provider: SOURCE,
                detail: format!("{what}: {e}"),
            })?;

        if !response.success {
            return Err(CollectorError::Api {
                provider: SOURCE,
                message: response.error_message(),
            });
        }

        Ok(response)
    }

    /// Verifies the API token once before enumeration.
    async fn verify_token(&self, cancel: &CancellationToken) -> Result<()> {
        let url = format!("{}/user/tokens/verify", self.cfg.base_url);
        match self.get_envelope::<Value>(&url, "token verify", cancel).await {
            Ok(_) => Ok(()),
            Err(CollectorError::Api { message, .. }) => Err(CollectorError::Api {
                provider: SOURCE,
                message: format!("token verification failed: {message}"),
            }),
            Err(e) => Err(e),
        }
    }

    /// Fetches all zones; iteration ends when the current page reaches the
    /// reported total page count.
    async fn fetch_all_zones(&self, cancel: &CancellationToken) -> Result<Vec<CloudflareZone>> {
        let mut zones = Vec::new();
        let mut page: u32 = 1;

        loop {
            if cancel.is_cancelled() {
                return Err(CollectorError::Cancelled);
            }

            let url = format!(
                "{}/zones?page={}&per_page={}",
                self.cfg.base_url, page, self.cfg.zones_per_page
            );
            let response: CloudflareResponse<Vec<Value>> =
                self.get_envelope(&url, "zone list", cancel).await?;

            let result = response.result.unwrap_or_default();
            let count = result.len();

            for raw in result {
                let Some(id) = raw.get("id").and_then(Value::as_str).map(str::to_string) else {
                    continue;
                };
                let Some(name) = raw.get("name").and_then(Value::as_str).map(str::to_string)
                else {
                    continue;
                };
                if id.is_empty() || name.is_empty() || naming::is_test_domain(&name) {
                    continue;
                }
                zones.push(CloudflareZone { id, name, raw });
            }

            let total_pages = response.result_info.map_or(0, |info| info.total_pages);
            if page >= total_pages || count == 0 {
                break;
            }
            page += 1;
        }

        Ok(zones)
    }

    /// Fetches all DNS records of one zone.
    async fn fetch_zone_records(
        &self,
        zone_id: &str,
        zone_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<CollectedDnsRecord>> {
        let mut records = Vec::new();
        let mut page: u32 = 1;

        loop {
            if cancel.is_cancelled() {
                return Err(CollectorError::Cancelled);
            }

            let url = format!(
                "{}/zones/{}/dns_records?page={}&per_page={}",
                self.cfg.base_url, zone_id, page, self.cfg.records_per_page
            );
            let response: CloudflareResponse<Vec<Value>> = self
                .get_envelope(&url, &format!("records for zone {zone_name}"), cancel)
                .await?;

            let result = response.result.unwrap_or_default();
            let count = result.len();

            for raw in result {
                // The provider returns fully-qualified hostnames.
                let subdomain = raw
                    .get("name")
                    .and_then(Value::as_str)
                    .map(|name| naming::extract_subdomain(name, zone_name))
                    .unwrap_or_default();
                let record_type = raw
                    .get("type")
                    .and_then(Value::as_str)
                    .map(naming::normalize_record_type)
                    .unwrap_or_default();
                let data = raw
                    .get("content")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let ttl = raw
                    .get("ttl")
                    .and_then(Value::as_i64)
                    .and_then(|v| i32::try_from(v).ok());
                let priority = raw
                    .get("priority")
                    .and_then(Value::as_i64)
                    .and_then(|v| i32::try_from(v).ok());

                records.push(CollectedDnsRecord {
                    domain: zone_name.to_string(),
                    subdomain,
                    record_type,
                    data,
                    ttl,
                    priority,
                    source: SOURCE.to_string(),
                    raw: Some(raw),
                });
            }

            let total_pages = response.result_info.map_or(0, |info| info.total_pages);
            if page >= total_pages || count == 0 {
                break;
            }
            page += 1;
        }

        Ok(records)
    }
}

#[async_trait]
impl Collector for CloudflareCollector {
    fn name(&self) -> &'static str {
        "cloudflare_dns"
    }

    fn kind(&self) -> CollectorKind {
        CollectorKind::DnsRecords
    }

    fn source(&self) -> &'static str {
        SOURCE
    }

    fn validate(&self) -> Result<()> {
        if self.cfg.api_token.is_empty() {
            return Err(CollectorError::MissingConfig("CLOUDFLARE_API_TOKEN"));
        }
        Ok(())
    }

    async fn collect(&self, cancel: &CancellationToken) -> Result<CollectionResult> {
        let mut result = CollectionResult::begin();

        self.verify_token(cancel).await?;

        log::info!("[Cloudflare] Fetching zones...");
        let zones = self.fetch_all_zones(cancel).await?;
        log::info!("[Cloudflare] Found {} zones", zones.len());

        for zone in &zones {
            result.domains.push(CollectedDomain {
                name: zone.name.clone(),
                registrar: SOURCE.to_string(),
                expiry_date: None,
                raw: Some(zone.raw.clone()),
            });
        }

        log::info!("[Cloudflare] Fetching DNS records for {} zones...", zones.len());
        for (i, zone) in zones.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(CollectorError::Cancelled);
            }

            match self.fetch_zone_records(&zone.id, &zone.name, cancel).await {
                Ok(mut records) => {
                    result.dns_records.append(&mut records);
                    result.swept_domains.push(zone.name.clone());
                }
                Err(CollectorError::Fetch(FetchError::Cancelled) | CollectorError::Cancelled) => {
                    return Err(CollectorError::Cancelled);
                }
                Err(e) => {
                    log::error!("[Cloudflare] Error fetching records for {}: {e}", zone.name);
                }
            }

            if (i + 1) % PROGRESS_INTERVAL == 0 {
                log::info!(
                    "[Cloudflare] Processed {}/{} zones, {} records so far",
                    i + 1,
                    zones.len(),
                    result.dns_records.len()
                );
            }
        }

        result.finish();
        log::info!(
            "[Cloudflare] Collection complete: {} zones, {} DNS records in {}s",
            result.domains.len(),
            result.dns_records.len(),
            result.duration().map_or(0, |d| d.num_seconds())
        );

        Ok(result)
    }
}
