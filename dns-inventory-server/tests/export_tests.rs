#![allow(clippy::expect_used, clippy::unwrap_used)]
//! Snapshot exporter: file contents, removed-asset projection, and
//! metadata merging.

mod common;

use std::fs;

use chrono::{Duration, Utc};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use dns_inventory_server::config::ExportConfig;
use dns_inventory_server::export::ExportService;
use dns_inventory_server::merger::Merger;
use dns_inventory_server::store::InventoryStore;

use common::{collected_domain, collected_record, scratch_store};

fn exporter(store: &InventoryStore, tmp: &tempfile::TempDir) -> ExportService {
    ExportService::new(
        store.clone(),
        ExportConfig {
            output_dir: tmp.path().join("data"),
        },
    )
}

fn read_json(tmp: &tempfile::TempDir, name: &str) -> Value {
    let raw = fs::read(tmp.path().join("data").join(name)).expect("snapshot file missing");
    serde_json::from_slice(&raw).expect("snapshot is not valid JSON")
}

/// Seed: foo.com discovered yesterday with a www record; today the domain
/// is still there but the record is gone.
async fn seed_with_removed_record(store: &InventoryStore) {
    let merger = Merger::new(store.connection().clone());
    let cancel = CancellationToken::new();
    let yesterday = Utc::now().date_naive() - Duration::days(1);
    let today = Utc::now().date_naive();

    merger
        .merge_domains_at("GoDaddy", &[collected_domain("foo.com")], yesterday, &cancel)
        .await
        .unwrap();
    merger
        .merge_dns_records_at(
            "GoDaddy",
            &[collected_record("foo.com", "www", "A", "1.2.3.4")],
            yesterday,
            &cancel,
        )
        .await
        .unwrap();

    merger
        .merge_domains_at("GoDaddy", &[collected_domain("foo.com")], today, &cancel)
        .await
        .unwrap();
    merger
        .merge_dns_records_scoped("GoDaddy", &[], &["foo.com".to_string()], today, &cancel)
        .await
        .unwrap();
}

#[tokio::test]
async fn export_all_writes_every_snapshot_file() {
    let (store, tmp) = scratch_store().await;
    seed_with_removed_record(&store).await;

    exporter(&store, &tmp).export_all().await.unwrap();

    let domains = read_json(&tmp, "domains.json");
    let domains = domains.as_array().unwrap();
    assert_eq!(domains.len(), 1);
    assert_eq!(domains[0]["domain"], "foo.com");
    assert_eq!(domains[0]["registrar"], "GoDaddy");
    assert_eq!(domains[0]["status"], "active");

    let subdomains = read_json(&tmp, "subdomains.json");
    let subdomains = subdomains.as_array().unwrap();
    assert_eq!(subdomains.len(), 1);
    assert_eq!(subdomains[0]["type"], "A");
    assert_eq!(subdomains[0]["status"], "removed");

    let metadata = read_json(&tmp, "metadata.json");
    assert!(metadata["services"]["dns"]["last_updated"].is_string());
    assert_eq!(metadata["services"]["dns"]["services"]["domains"]["count"], 1);
    assert_eq!(
        metadata["services"]["dns"]["services"]["subdomains"]["count"],
        1
    );
}

#[tokio::test]
async fn removed_json_projects_tombstoned_assets() {
    let (store, tmp) = scratch_store().await;
    seed_with_removed_record(&store).await;

    exporter(&store, &tmp).export_all().await.unwrap();

    let yesterday = (Utc::now().date_naive() - Duration::days(1)).to_string();
    let removed = read_json(&tmp, "removed.json");
    let removed = removed.as_array().unwrap();
    assert_eq!(removed.len(), 1);

    let asset = &removed[0];
    assert_eq!(asset["asset_type"], "subdomain");
    assert_eq!(asset["name"], "www.foo.com");
    assert_eq!(asset["provider"], "GoDaddy");
    assert_eq!(asset["details"], "A record - 1.2.3.4");
    assert_eq!(asset["status"], "removed");
    assert_eq!(asset["removed_date"], yesterday.as_str());
}

#[tokio::test]
async fn removed_domain_projects_as_domain_asset() {
    let (store, tmp) = scratch_store().await;
    let merger = Merger::new(store.connection().clone());
    let cancel = CancellationToken::new();
    let yesterday = Utc::now().date_naive() - Duration::days(1);
    let today = Utc::now().date_naive();

    merger
        .merge_domains_at("GoDaddy", &[collected_domain("gone.com")], yesterday, &cancel)
        .await
        .unwrap();
    // Today's sweep no longer returns it.
    merger
        .merge_domains_at("GoDaddy", &[], today, &cancel)
        .await
        .unwrap();

    exporter(&store, &tmp).export_all().await.unwrap();

    let removed = read_json(&tmp, "removed.json");
    let removed = removed.as_array().unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0]["asset_type"], "domain");
    assert_eq!(removed[0]["name"], "gone.com");
    assert_eq!(removed[0]["details"], "Domain removed from registrar");
}

#[tokio::test]
async fn metadata_merge_preserves_unrelated_keys() {
    let (store, tmp) = scratch_store().await;
    let data_dir = tmp.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(
        data_dir.join("metadata.json"),
        serde_json::to_string_pretty(&json!({
            "generator": "dashboard-tools",
            "services": {
                "certificates": { "count": 7 },
            },
        }))
        .unwrap(),
    )
    .unwrap();

    exporter(&store, &tmp).export_all().await.unwrap();

    let metadata = read_json(&tmp, "metadata.json");
    assert_eq!(metadata["generator"], "dashboard-tools");
    assert_eq!(metadata["services"]["certificates"]["count"], 7);
    assert_eq!(metadata["services"]["dns"]["name"], "DNS");
    assert!(metadata["last_updated"].is_string());
}

#[tokio::test]
async fn re_export_with_unchanged_inventory_is_byte_identical() {
    let (store, tmp) = scratch_store().await;
    seed_with_removed_record(&store).await;
    let export = exporter(&store, &tmp);

    export.export_all().await.unwrap();
    let first: Vec<Vec<u8>> = ["domains.json", "subdomains.json", "removed.json"]
        .iter()
        .map(|name| fs::read(tmp.path().join("data").join(name)).unwrap())
        .collect();

    export.export_all().await.unwrap();
    let second: Vec<Vec<u8>> = ["domains.json", "subdomains.json", "removed.json"]
        .iter()
        .map(|name| fs::read(tmp.path().join("data").join(name)).unwrap())
        .collect();

    assert_eq!(first, second);
}

#[tokio::test]
async fn single_file_exports_write_only_their_target() {
    let (store, tmp) = scratch_store().await;
    seed_with_removed_record(&store).await;

    let export = exporter(&store, &tmp);
    export.export_domains().await.unwrap();

    let data_dir = tmp.path().join("data");
    assert!(data_dir.join("domains.json").exists());
    assert!(!data_dir.join("subdomains.json").exists());

    export.export_dns_records().await.unwrap();
    assert!(data_dir.join("subdomains.json").exists());
    assert!(!data_dir.join("removed.json").exists());
}
