//! DNS asset inventory server binary.
//!
//! Startup order: configuration → database (with migrations) → collector
//! registration → scheduler + HTTP server. SIGINT/SIGTERM cancel the
//! process-wide token; background syncs get a short grace period to release
//! their locks before exit.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use dns_inventory_collector::{
    CloudflareCollector, CollectorRegistry, GodaddyCollector,
};
use dns_inventory_server::api::{self, AppState};
use dns_inventory_server::config::Config;
use dns_inventory_server::export::ExportService;
use dns_inventory_server::lock::SyncLock;
use dns_inventory_server::scheduler::Scheduler;
use dns_inventory_server::store::InventoryStore;
use dns_inventory_server::sync::SyncService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Starting DNS inventory server...");

    let cfg = Config::from_env()?;
    cfg.validate()?;
    log::info!("Configuration loaded");
    log::info!("  Server: {}:{}", cfg.server.host, cfg.server.port);
    log::info!("  Scheduler enabled: {}", cfg.scheduler.enabled);

    log::info!("Connecting to database...");
    let store = InventoryStore::connect(&cfg.database).await?;
    log::info!("Database connected, schema up to date");

    let registry = Arc::new(CollectorRegistry::new());
    if cfg.godaddy.is_configured() {
        let collector = GodaddyCollector::new(cfg.godaddy.clone(), cfg.rate_limit.clone());
        match registry.register(Arc::new(collector)) {
            Ok(()) => log::info!("GoDaddy DNS collector registered"),
            Err(e) => log::warn!("Failed to register GoDaddy collector: {e}"),
        }
    } else {
        log::info!("GoDaddy collector skipped (not configured)");
    }
    if cfg.cloudflare.is_configured() {
        let collector = CloudflareCollector::new(cfg.cloudflare.clone(), cfg.rate_limit.clone());
        match registry.register(Arc::new(collector)) {
            Ok(()) => log::info!("Cloudflare DNS collector registered"),
            Err(e) => log::warn!("Failed to register Cloudflare collector: {e}"),
        }
    } else {
        log::info!("Cloudflare collector skipped (not configured)");
    }
    log::info!(
        "Registered {} collectors: {:?}",
        registry.count(),
        registry.names()
    );

    let cancel = CancellationToken::new();
    let lock = Arc::new(SyncLock::new(store.connection().clone()));
    let sync = Arc::new(SyncService::new(&store));
    let export = Arc::new(ExportService::new(store.clone(), cfg.export.clone()));
    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&registry),
        sync,
        Arc::clone(&export),
        lock,
        cfg.scheduler.clone(),
        cancel.clone(),
    ));

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        log::info!("Received shutdown signal");
        signal_cancel.cancel();
    });

    let scheduler_task = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move {
            if let Err(e) = scheduler.start().await {
                log::error!("Scheduler error: {e}");
            }
        })
    };

    let state = Arc::new(AppState {
        scheduler,
        store,
        export,
    });
    let app = api::router(state);

    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Listening on http://{addr}");

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    // Give background syncs a moment to observe cancellation and release
    // their locks.
    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(2), scheduler_task).await;
    log::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
