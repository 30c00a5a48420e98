//! GoDaddy registrar collector.
//!
//! Enumerates registered domains with marker-based pagination, then sweeps
//! each domain's DNS records with offset-based pagination. Quota exhaustion
//! during the record sweep stops enumeration but keeps everything collected
//! so far; the reconciler's scoped tombstone pass handles the partial set.

mod types;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use dns_inventory_core::naming;
use dns_inventory_core::{CollectedDnsRecord, CollectedDomain, CollectionResult, CollectorKind};

use crate::error::{CollectorError, FetchError, Result};
use crate::fetch::{FetchClient, RetryPolicy};
use crate::traits::Collector;

use types::GodaddyDomain;

pub(crate) const GODADDY_API_BASE: &str = "https://api.godaddy.com";

const SOURCE: &str = "GoDaddy";
const PROGRESS_INTERVAL: usize = 50;

/// Configuration for [`GodaddyCollector`], filled from `GODADDY_*`
/// environment variables.
#[derive(Debug, Clone)]
pub struct GodaddyConfig {
    pub api_key: String,
    pub api_secret: String,
    pub base_url: String,
    /// Page size for the domain list (marker pagination).
    pub domains_limit: usize,
    /// Page size for per-domain record fetches (offset pagination).
    pub records_limit: usize,
}

impl Default for GodaddyConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            base_url: GODADDY_API_BASE.to_string(),
            domains_limit: 1000,
            records_limit: 100,
        }
    }
}

impl GodaddyConfig {
    /// Whether both credential halves are present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

/// Collector for domains and DNS records registered at GoDaddy.
pub struct GodaddyCollector {
    cfg: GodaddyConfig,
    client: FetchClient,
}

impl GodaddyCollector {
    #[must_use]
    pub fn new(cfg: GodaddyConfig, policy: RetryPolicy) -> Self {
        Self {
            cfg,
            client: FetchClient::new(policy),
        }
    }

    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&format!(
            "sso-key {}:{}",
            self.cfg.api_key, self.cfg.api_secret
        )) {
            headers.insert(AUTHORIZATION, value);
        }
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Fetches the full domain list via marker pagination.
    ///
    /// The marker for the next page is the last domain name of the current
    /// raw page; a short or empty page terminates the loop. Duplicate names
    /// and test domains are dropped.
    async fn fetch_all_domains(&self, cancel: &CancellationToken) -> Result<Vec<GodaddyDomain>> {
        let mut domains = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut marker: Option<String> = None;

        loop {
            if cancel.is_cancelled() {
                return Err(CollectorError::Cancelled);
            }

            let mut url = format!(
                "{}/v1/domains?limit={}",
                self.cfg.base_url, self.cfg.domains_limit
            );
            if let Some(marker) = &marker {
                url.push_str(&format!("&marker={}", urlencoding::encode(marker)));
            }

            let body = self.client.get(&url, self.auth_headers(), cancel).await?;
            let page: Vec<Value> = serde_json::from_str(&body).map_err(|e| {
                CollectorError::InvalidResponse {
                    provider: SOURCE,
                    detail: format!("domain list: {e}"),
                }
            })?;

            if page.is_empty() {
                break;
            }

            let page_len = page.len();
            let next_marker = page
                .last()
                .and_then(|entry| entry.get("domain"))
                .and_then(Value::as_str)
                .map(str::to_string);

            for raw in page {
                let Some(name) = raw.get("domain").and_then(Value::as_str).map(str::to_string)
                else {
                    continue;
                };
                if name.is_empty() || !seen.insert(name.to_lowercase()) {
                    continue;
                }
                if naming::is_test_domain(&name) {
                    continue;
                }

                let expires = raw
                    .get("expires")
                    .and_then(Value::as_str)
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                    .map(|dt| dt.with_timezone(&Utc).date_naive());

                domains.push(GodaddyDomain { name, expires, raw });
            }

            if page_len < self.cfg.domains_limit {
                break;
            }
            let Some(next) = next_marker else { break };
            if marker.as_deref() == Some(next.as_str()) {
                break;
            }
            marker = Some(next);
        }

        Ok(domains)
    }

    /// Fetches all DNS records of one domain via offset pagination.
    async fn fetch_domain_records(
        &self,
        domain: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<CollectedDnsRecord>> {
        let mut records = Vec::new();
        let mut offset = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Err(CollectorError::Cancelled);
            }

            let url = format!(
                "{}/v1/domains/{}/records?limit={}&offset={}",
                self.cfg.base_url,
                urlencoding::encode(domain),
                self.cfg.records_limit,
                offset
            );

            let body = self.client.get(&url, self.auth_headers(), cancel).await?;
            let page: Vec<Value> = serde_json::from_str(&body).map_err(|e| {
                CollectorError::InvalidResponse {
                    provider: SOURCE,
                    detail: format!("records for {domain}: {e}"),
                }
            })?;

            if page.is_empty() {
                break;
            }
            let page_len = page.len();

            for raw in page {
                let subdomain = raw
                    .get("name")
                    .and_then(Value::as_str)
                    .map(naming::normalize_subdomain)
                    .unwrap_or_default();
                let record_type = raw
                    .get("type")
                    .and_then(Value::as_str)
                    .map(naming::normalize_record_type)
                    .unwrap_or_default();
                let data = raw
                    .get("data")
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
                    domain: domain.to_string(),
                    subdomain,
                    record_type,
                    data,
                    ttl,
                    priority,
                    source: SOURCE.to_string(),
                    raw: Some(raw),
                });
            }

            if page_len < self.cfg.records_limit {
                break;
            }
            offset += self.cfg.records_limit;
        }

        Ok(records)
    }
}

#[async_trait]
impl Collector for GodaddyCollector {
    fn name(&self) -> &'static str {
        "godaddy_dns"
    }

    fn kind(&self) -> CollectorKind {
        CollectorKind::DnsRecords
    }

    fn source(&self) -> &'static str {
        SOURCE
    }

    fn validate(&self) -> Result<()> {
        if self.cfg.api_key.is_empty() {
            return Err(CollectorError::MissingConfig("GODADDY_API_KEY"));
        }
        if self.cfg.api_secret.is_empty() {
            return Err(CollectorError::MissingConfig("GODADDY_API_SECRET"));
        }
        Ok(())
    }

    async fn collect(&self, cancel: &CancellationToken) -> Result<CollectionResult> {
        let mut result = CollectionResult::begin();

        log::info!("[GoDaddy] Fetching domains...");
        let domains = self.fetch_all_domains(cancel).await?;
        log::info!("[GoDaddy] Found {} domains", domains.len());

        for d in &domains {
            result.domains.push(CollectedDomain {
                name: d.name.clone(),
                registrar: SOURCE.to_string(),
                expiry_date: d.expires,
                raw: Some(d.raw.clone()),
            });
        }

        log::info!("[GoDaddy] Fetching DNS records for {} domains...", domains.len());
        for (i, d) in domains.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(CollectorError::Cancelled);
            }

            match self.fetch_domain_records(&d.name, cancel).await {
                Ok(mut records) => {
                    result.dns_records.append(&mut records);
                    result.swept_domains.push(d.name.clone());
                }
                Err(CollectorError::Fetch(FetchError::QuotaExceeded)) => {
                    log::warn!(
                        "[GoDaddy] Quota exceeded after {} domains, keeping partial sweep",
                        i + 1
                    );
                    break;
                }
                Err(CollectorError::Fetch(FetchError::NotFound)) => {
                    log::warn!("[GoDaddy] Domain {} not found, skipping", d.name);
                }
                Err(CollectorError::Fetch(FetchError::Cancelled) | CollectorError::Cancelled) => {
                    return Err(CollectorError::Cancelled);
                }
                Err(e) => {
                    log::error!("[GoDaddy] Error fetching records for {}: {e}", d.name);
                }
            }

            if (i + 1) % PROGRESS_INTERVAL == 0 {
                log::info!(
                    "[GoDaddy] Processed {}/{} domains, {} records so far",
                    i + 1,
                    domains.len(),
                    result.dns_records.len()
                );
            }
        }

        result.finish();
        log::info!(
            "[GoDaddy] Collection complete: {} domains, {} DNS records in {}s",
            result.domains.len(),
            result.dns_records.len(),
            result.duration().map_or(0, |d| d.num_seconds())
        );

        Ok(result)
    }
}
