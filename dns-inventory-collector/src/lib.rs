//! # dns-inventory-collector
//!
//! Pluggable upstream collectors for the DNS asset inventory, plus the
//! rate-limited HTTP fetch layer they share.
//!
//! | Collector | Source | Pagination | Auth |
//! |-----------|--------|------------|------|
//! | [`GodaddyCollector`] | GoDaddy | opaque marker (domains), offset (records) | `sso-key` header |
//! | [`CloudflareCollector`] | Cloudflare | 1-based pages with reported totals | Bearer token |
//!
//! A [`Collector`] performs one full sweep of its provider and returns
//! normalized [`CollectionResult`](dns_inventory_core::CollectionResult)
//! data; the server crate reconciles that into the durable inventory.
//! Collectors are looked up through a [`CollectorRegistry`], which runs
//! `validate()` at registration and rejects duplicate names.
//!
//! # Failure semantics
//!
//! The [`FetchClient`] absorbs transient upstream failures (5xx, transport
//! errors, 429 throttling) with exponential backoff and classifies the rest
//! ([`FetchError`]). Quota exhaustion mid-sweep yields a *partial* result
//! rather than an error; per-domain 404s and other per-domain failures skip
//! that domain and continue.

mod collectors;
mod error;
mod fetch;
mod registry;
mod traits;

pub use collectors::{CloudflareCollector, CloudflareConfig, GodaddyCollector, GodaddyConfig};
pub use error::{CollectorError, FetchError, Result};
pub use fetch::{FetchClient, RetryPolicy};
pub use registry::CollectorRegistry;
pub use traits::Collector;
