//! Shared helpers for server integration tests.

#![allow(dead_code)]

use tempfile::TempDir;

use dns_inventory_core::{CollectedDnsRecord, CollectedDomain};
use dns_inventory_server::config::DatabaseConfig;
use dns_inventory_server::store::InventoryStore;

/// Opens a scratch SQLite-backed store in a temp directory.
pub async fn scratch_store() -> (InventoryStore, TempDir) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let db_path = tmp.path().join("test.db");
    let store = InventoryStore::connect(&DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", db_path.display()),
        max_connections: 5,
        max_idle: 1,
    })
    .await
    .expect("failed to open scratch store");
    (store, tmp)
}

pub fn collected_domain(name: &str) -> CollectedDomain {
    CollectedDomain {
        name: name.to_string(),
        registrar: "GoDaddy".to_string(),
        expiry_date: None,
        raw: None,
    }
}

pub fn collected_record(
    domain: &str,
    subdomain: &str,
    record_type: &str,
    data: &str,
) -> CollectedDnsRecord {
    CollectedDnsRecord {
        domain: domain.to_string(),
        subdomain: subdomain.to_string(),
        record_type: record_type.to_string(),
        data: data.to_string(),
        ttl: Some(300),
        priority: None,
        source: "GoDaddy".to_string(),
        raw: None,
    }
}
