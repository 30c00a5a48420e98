#![allow(clippy::expect_used, clippy::unwrap_used)]
//! Behavior tests for the retrying fetch client against a local mock server.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::routing::get;
use tokio_util::sync::CancellationToken;

use dns_inventory_collector::{FetchClient, FetchError};

use common::{fast_retry_policy, spawn_upstream};

fn client() -> FetchClient {
    FetchClient::new(fast_retry_policy())
}

#[tokio::test]
async fn success_returns_body() {
    let router = Router::new().route("/ok", get(|| async { "hello" }));
    let addr = spawn_upstream(router).await;

    let body = client()
        .get(
            &format!("http://{addr}/ok"),
            Default::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(body, "hello");
}

#[tokio::test]
async fn server_errors_are_retried_until_success() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
        "/flaky",
        get(move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
                } else {
                    (StatusCode::OK, "recovered")
                }
            }
        }),
    );
    let addr = spawn_upstream(router).await;

    let body = client()
        .get(
            &format!("http://{addr}/flaky"),
            Default::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(body, "recovered");
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn server_error_surfaces_after_retries_exhausted() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
        "/down",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                (StatusCode::BAD_GATEWAY, "upstream down")
            }
        }),
    );
    let addr = spawn_upstream(router).await;

    let err = client()
        .get(
            &format!("http://{addr}/down"),
            Default::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Server { status: 502, .. }));
    // Initial attempt plus max_retries.
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn not_found_fails_immediately() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
        "/missing",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                (StatusCode::NOT_FOUND, "nope")
            }
        }),
    );
    let addr = spawn_upstream(router).await;

    let err = client()
        .get(
            &format!("http://{addr}/missing"),
            Default::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
        "/bad",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                (StatusCode::UNPROCESSABLE_ENTITY, "bad request shape")
            }
        }),
    );
    let addr = spawn_upstream(router).await;

    let err = client()
        .get(
            &format!("http://{addr}/bad"),
            Default::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Client { status: 422, body } if body.contains("bad request")));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn quota_exceeded_body_fails_immediately() {
    let router = Router::new().route(
        "/quota",
        get(|| async {
            (
                StatusCode::FORBIDDEN,
                r#"{"code":"QUOTA_EXCEEDED","message":"daily limit reached"}"#,
            )
        }),
    );
    let addr = spawn_upstream(router).await;

    let err = client()
        .get(
            &format!("http://{addr}/quota"),
            Default::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(err.is_quota_exceeded());
}

#[tokio::test]
async fn rate_limited_is_retried_after_penalty_sleep() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
        "/throttle",
        get(move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    (StatusCode::TOO_MANY_REQUESTS, "slow down")
                } else {
                    (StatusCode::OK, "through")
                }
            }
        }),
    );
    let addr = spawn_upstream(router).await;

    let body = client()
        .get(
            &format!("http://{addr}/throttle"),
            Default::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(body, "through");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn cancelled_token_aborts_before_any_request() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
        "/never",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                "unreachable"
            }
        }),
    );
    let addr = spawn_upstream(router).await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = client()
        .get(&format!("http://{addr}/never"), Default::default(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Cancelled));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn default_headers_are_applied() {
    let router = Router::new().route(
        "/echo",
        get(|request: Request| async move {
            let headers = request.headers();
            format!(
                "{}|{}",
                headers
                    .get("user-agent")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default(),
                headers
                    .get("accept")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default(),
            )
        }),
    );
    let addr = spawn_upstream(router).await;

    let body = client()
        .get(
            &format!("http://{addr}/echo"),
            Default::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    let (user_agent, accept) = body.split_once('|').unwrap();
    assert!(user_agent.starts_with("dns-inventory/"));
    assert_eq!(accept, "application/json");
}
