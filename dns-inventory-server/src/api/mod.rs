//! REST API endpoints for the inventory and the sync pipeline.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/v1/health` | Health check |
//! | `GET` | `/api/v1/sync/status` | Latest sync run per collector |
//! | `GET` | `/api/v1/sync/status/{collector}` | Single collector status |
//! | `POST` | `/api/v1/sync/trigger/{collector}` | Trigger a manual sync |
//! | `POST` | `/api/v1/sync/trigger-all` | Trigger all collectors |
//! | `GET` | `/api/v1/domains` | Domains, filterable by status/source |
//! | `GET` | `/api/v1/dns-records` | DNS records, filterable |
//! | `POST` | `/api/v1/export` | Write JSON snapshot files |
//! | `GET` | `/api/v1/scheduler/jobs` | Scheduled cron jobs |

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use dns_inventory_core::AssetStatus;

use crate::export::ExportService;
use crate::scheduler::Scheduler;
use crate::store::InventoryStore;

/// Application state shared across all handlers.
pub struct AppState {
    pub scheduler: Arc<Scheduler>,
    pub store: InventoryStore,
    pub export: Arc<ExportService>,
}

/// Creates the API router, with all routes under `/api/v1`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/sync/status", get(sync_status))
        .route("/api/v1/sync/status/{collector}", get(collector_status))
        .route("/api/v1/sync/trigger/{collector}", post(trigger_sync))
        .route("/api/v1/sync/trigger-all", post(trigger_sync_all))
        .route("/api/v1/domains", get(get_domains))
        .route("/api/v1/dns-records", get(get_dns_records))
        .route("/api/v1/export", post(export))
        .route("/api/v1/scheduler/jobs", get(scheduler_jobs))
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// An empty or missing status filter means "no filter"; anything else must
/// be a valid asset status.
fn parse_status_filter(raw: Option<&str>) -> Result<Option<AssetStatus>, Response> {
    match raw {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|_| {
            error_response(
                StatusCode::BAD_REQUEST,
                format!("invalid status filter: {value}"),
            )
        }),
    }
}

fn non_empty(raw: Option<&String>) -> Option<&str> {
    raw.map(String::as_str).filter(|s| !s.is_empty())
}

/// `GET /api/v1/health`
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

/// `GET /api/v1/sync/status` — latest sync run per collector.
async fn sync_status(State(state): State<Arc<AppState>>) -> Response {
    match state.scheduler.all_latest().await {
        Ok(collectors) => Json(json!({ "collectors": collectors })).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// `GET /api/v1/sync/status/{collector}` — single collector status.
async fn collector_status(
    State(state): State<Arc<AppState>>,
    Path(collector): Path<String>,
) -> Response {
    let is_running = match state.scheduler.is_running(&collector).await {
        Ok(running) => running,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    let last_run = match state.scheduler.latest_run(&collector).await {
        Ok(run) => run,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    let next_run = state.scheduler.next_run(&collector).await.ok().flatten();

    let mut body = json!({
        "collector": collector,
        "is_running": is_running,
        "next_run": next_run,
    });
    if let Some(run) = last_run
        && let Ok(value) = serde_json::to_value(&run)
    {
        body["last_run"] = value;
    }

    Json(body).into_response()
}

/// `POST /api/v1/sync/trigger/{collector}` — trigger a manual sync.
async fn trigger_sync(
    State(state): State<Arc<AppState>>,
    Path(collector): Path<String>,
) -> Response {
    match state.scheduler.is_running(&collector).await {
        Ok(true) => {
            return (
                StatusCode::CONFLICT,
                Json(json!({
                    "status": "already_running",
                    "collector": collector,
                    "message": "Sync is already in progress",
                })),
            )
                .into_response();
        }
        Ok(false) => {}
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }

    match state.scheduler.trigger_sync(&collector) {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(json!({
                "status": "started",
                "collector": collector,
                "message": "Sync started in background",
            })),
        )
            .into_response(),
        Err(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

/// `POST /api/v1/sync/trigger-all` — trigger every registered collector.
async fn trigger_sync_all(State(state): State<Arc<AppState>>) -> Response {
    match state.scheduler.trigger_sync_all() {
        Ok(_) => (
            StatusCode::ACCEPTED,
            Json(json!({
                "status": "started",
                "message": "All syncs started in background",
            })),
        )
            .into_response(),
        Err(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct DomainsQuery {
    status: Option<String>,
    source: Option<String>,
}

/// `GET /api/v1/domains?status=&source=`
async fn get_domains(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DomainsQuery>,
) -> Response {
    let status = match parse_status_filter(query.status.as_deref()) {
        Ok(status) => status,
        Err(response) => return response,
    };

    match state
        .store
        .get_domains(status, non_empty(query.source.as_ref()))
        .await
    {
        Ok(domains) => Json(domains).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct DnsRecordsQuery {
    status: Option<String>,
    source: Option<String>,
    domain: Option<String>,
}

/// `GET /api/v1/dns-records?status=&source=&domain=`
async fn get_dns_records(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DnsRecordsQuery>,
) -> Response {
    let status = match parse_status_filter(query.status.as_deref()) {
        Ok(status) => status,
        Err(response) => return response,
    };

    match state
        .store
        .get_dns_records(
            status,
            non_empty(query.source.as_ref()),
            non_empty(query.domain.as_ref()),
        )
        .await
    {
        Ok(records) => Json(records).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// `POST /api/v1/export` — write snapshot JSON files now.
async fn export(State(state): State<Arc<AppState>>) -> Response {
    match state.export.export_all().await {
        Ok(()) => Json(json!({
            "status": "success",
            "message": "JSON files exported successfully",
        }))
        .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// `GET /api/v1/scheduler/jobs`
async fn scheduler_jobs(State(state): State<Arc<AppState>>) -> Response {
    let jobs = state.scheduler.scheduled_jobs().await;
    Json(json!({ "jobs": jobs })).into_response()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    use dns_inventory_collector::{Collector, CollectorRegistry};
    use dns_inventory_core::{CollectionResult, CollectorKind, TriggerType};

    use crate::config::{DatabaseConfig, ExportConfig, SchedulerConfig};
    use crate::export::ExportService;
    use crate::lock::SyncLock;
    use crate::scheduler::Scheduler;
    use crate::store::InventoryStore;
    use crate::sync::SyncService;

    use super::*;

    struct StubCollector;

    #[async_trait]
    impl Collector for StubCollector {
        fn name(&self) -> &'static str {
            "stub_dns"
        }

        fn kind(&self) -> CollectorKind {
            CollectorKind::DnsRecords
        }

        fn source(&self) -> &'static str {
            "Stub"
        }

        fn validate(&self) -> dns_inventory_collector::Result<()> {
            Ok(())
        }

        async fn collect(
            &self,
            _cancel: &CancellationToken,
        ) -> dns_inventory_collector::Result<CollectionResult> {
            Ok(CollectionResult::begin())
        }
    }

    async fn test_state() -> (Arc<AppState>, Arc<SyncLock>, tempfile::TempDir) {
        let tmp = tempfile::tempdir().expect("failed to create temp dir");
        let db_path = tmp.path().join("api.db");
        let store = InventoryStore::connect(&DatabaseConfig {
            url: format!("sqlite://{}?mode=rwc", db_path.display()),
            max_connections: 5,
            max_idle: 1,
        })
        .await
        .expect("failed to open store");

        let registry = Arc::new(CollectorRegistry::new());
        registry.register(Arc::new(StubCollector)).unwrap();

        let lock = Arc::new(SyncLock::new(store.connection().clone()));
        let sync = Arc::new(SyncService::new(&store));
        let export = Arc::new(ExportService::new(
            store.clone(),
            ExportConfig {
                output_dir: tmp.path().join("data"),
            },
        ));
        let scheduler = Arc::new(Scheduler::new(
            registry,
            sync,
            Arc::clone(&export),
            Arc::clone(&lock),
            SchedulerConfig {
                enabled: false,
                dns_cron: "0 6 * * *".to_string(),
                domains_cron: "0 0 * * 0".to_string(),
            },
            CancellationToken::new(),
        ));

        let state = Arc::new(AppState {
            scheduler,
            store,
            export,
        });
        (state, lock, tmp)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let (state, _lock, _tmp) = test_state().await;
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn domains_start_empty() {
        let (state, _lock, _tmp) = test_state().await;
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/domains")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn invalid_status_filter_is_rejected() {
        let (state, _lock, _tmp) = test_state().await;
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/dns-records?status=paused")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn sync_status_starts_empty() {
        let (state, _lock, _tmp) = test_state().await;
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/sync/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["collectors"],
            serde_json::json!([])
        );
    }

    #[tokio::test]
    async fn collector_status_for_idle_collector() {
        let (state, _lock, _tmp) = test_state().await;
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/sync/status/stub_dns")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["collector"], "stub_dns");
        assert_eq!(body["is_running"], false);
        assert!(body.get("last_run").is_none());
    }

    #[tokio::test]
    async fn trigger_unknown_collector_is_bad_request() {
        let (state, _lock, _tmp) = test_state().await;
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/sync/trigger/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn trigger_starts_sync_in_background() {
        let (state, _lock, _tmp) = test_state().await;
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/sync/trigger/stub_dns")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_json(response).await["status"], "started");
    }

    #[tokio::test]
    async fn trigger_while_running_conflicts() {
        let (state, lock, _tmp) = test_state().await;
        let app = router(state);

        // Hold the lock as if a sync were in flight.
        let guard = lock
            .try_acquire("stub_dns", CollectorKind::DnsRecords, TriggerType::Manual)
            .await
            .unwrap()
            .expect("lock should be free");

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/sync/trigger/stub_dns")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await["status"], "already_running");

        drop(guard);
    }

    #[tokio::test]
    async fn export_writes_snapshot_files() {
        let (state, _lock, tmp) = test_state().await;
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/export")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let data_dir = tmp.path().join("data");
        for file in ["domains.json", "subdomains.json", "removed.json", "metadata.json"] {
            assert!(data_dir.join(file).exists(), "{file} missing");
        }
    }

    #[tokio::test]
    async fn scheduler_jobs_empty_when_not_started() {
        let (state, _lock, _tmp) = test_state().await;
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/scheduler/jobs")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["jobs"], serde_json::json!([]));
    }
}
