//! Shared helpers for collector integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;

use dns_inventory_collector::RetryPolicy;

/// Binds a mock upstream API on an ephemeral local port.
pub async fn spawn_upstream(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind mock upstream");
    let addr = listener.local_addr().expect("mock upstream has no address");

    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    addr
}

/// Retry policy that keeps tests fast: no real backoff or 429 penalty.
pub fn fast_retry_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        backoff_factor: 0.0,
        sleep_on_429: Duration::from_millis(10),
    }
}
