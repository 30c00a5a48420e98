//! Environment-driven configuration.
//!
//! Variables are read straight from the process environment with hand-rolled
//! defaults; `DATABASE_URL` plus at least one fully-configured collector are
//! required, everything else falls back.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use dns_inventory_collector::{CloudflareConfig, GodaddyConfig, RetryPolicy};

use crate::error::{ServerError, ServerResult};

/// All application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub godaddy: GodaddyConfig,
    pub cloudflare: CloudflareConfig,
    pub rate_limit: RetryPolicy,
    pub scheduler: SchedulerConfig,
    pub export: ExportConfig,
}

/// HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Database connection and pool sizing.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub max_idle: u32,
}

/// Cron scheduling knobs.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// Cron expression for DNS-record collectors.
    pub dns_cron: String,
    /// Cron expression for domain collectors.
    pub domains_cron: String,
}

/// Snapshot exporter target.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    /// Returns `ServerError::Config` if `DATABASE_URL` is missing.
    pub fn from_env() -> ServerResult<Self> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ServerError::Config("DATABASE_URL is required".to_string()))?;

        let godaddy_defaults = GodaddyConfig::default();
        let cloudflare_defaults = CloudflareConfig::default();
        let retry_defaults = RetryPolicy::default();

        Ok(Self {
            server: ServerConfig {
                host: env_or("SERVER_HOST", "0.0.0.0"),
                port: env_parse("SERVER_PORT", 8080),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 25),
                max_idle: env_parse("DATABASE_MAX_IDLE", 5),
            },
            godaddy: GodaddyConfig {
                api_key: env_or("GODADDY_API_KEY", ""),
                api_secret: env_or("GODADDY_API_SECRET", ""),
                base_url: env_or("GODADDY_BASE_URL", &godaddy_defaults.base_url),
                domains_limit: env_parse("GODADDY_DOMAINS_LIMIT", godaddy_defaults.domains_limit),
                records_limit: env_parse("GODADDY_RECORDS_LIMIT", godaddy_defaults.records_limit),
            },
            cloudflare: CloudflareConfig {
                api_token: env_or("CLOUDFLARE_API_TOKEN", ""),
                base_url: env_or("CLOUDFLARE_BASE_URL", &cloudflare_defaults.base_url),
                zones_per_page: env_parse(
                    "CLOUDFLARE_ZONES_PER_PAGE",
                    cloudflare_defaults.zones_per_page,
                ),
                records_per_page: env_parse(
                    "CLOUDFLARE_RECORDS_PER_PAGE",
                    cloudflare_defaults.records_per_page,
                ),
            },
            rate_limit: RetryPolicy {
                max_retries: env_parse("RATE_LIMIT_MAX_RETRIES", retry_defaults.max_retries),
                backoff_factor: env_parse(
                    "RATE_LIMIT_BACKOFF_FACTOR",
                    retry_defaults.backoff_factor,
                ),
                sleep_on_429: env_duration_secs("RATE_LIMIT_SLEEP_ON_429", retry_defaults.sleep_on_429),
            },
            scheduler: SchedulerConfig {
                enabled: env_bool("SCHEDULER_ENABLED", true),
                dns_cron: env_or("SCHEDULER_DNS_CRON", "0 6 * * *"),
                domains_cron: env_or("SCHEDULER_DOMAINS_CRON", "0 0 * * 0"),
            },
            export: ExportConfig {
                output_dir: PathBuf::from(env_or("JSON_OUTPUT_DIR", "../data")),
            },
        })
    }

    /// Startup validation: fail fast unless at least one collector has
    /// complete credentials.
    pub fn validate(&self) -> ServerResult<()> {
        if self.database.url.is_empty() {
            return Err(ServerError::Config("DATABASE_URL is required".to_string()));
        }
        if !self.godaddy.is_configured() && !self.cloudflare.is_configured() {
            return Err(ServerError::Config(
                "at least one provider (GoDaddy or Cloudflare) must be configured".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|raw| parse_bool(&raw))
        .unwrap_or(default)
}

fn env_duration_secs(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|raw| parse_duration_secs(&raw))
        .unwrap_or(default)
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim(), "1" | "true" | "TRUE" | "True")
}

/// Accepts `30` or `30s`.
fn parse_duration_secs(raw: &str) -> Option<Duration> {
    let trimmed = raw.trim().trim_end_matches(['s', 'S']);
    trimmed.parse::<u64>().ok().map(Duration::from_secs)
}
