#[allow(unused)]
use utils::*;

use kubeload::{run_all, SetupError};
use kubeload_core::{ApiResource, UserConfig};
use kubeload_runtime::HttpConnector;
use mock_service::{MockCluster, MockServer};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
#[ntest::timeout(10_000)]
async fn rejected_user_does_not_affect_others() {
    init();
    let server = MockServer::start(MockCluster::sample().token("alice-token").token("bob-token"))
        .await
        .unwrap();

    let users = vec![
        UserConfig::new("alice", "alice-token", 2),
        UserConfig::new("eve", "stolen-token", 2),
        UserConfig::new("bob", "bob-token", 1),
    ];
    let report = run(cluster(&server), &users, Duration::from_millis(200)).await;

    assert_eq!(report.stats.keys().collect::<Vec<_>>(), vec!["alice", "bob"]);
    assert!(report.failures["eve"].contains("401"));

    for stats in report.stats.values().flatten() {
        assert!(stats.total_calls > 0);
        assert_eq!(stats.errors(), 0);
    }
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn unreadable_ca_fails_every_user() {
    init();
    let server = MockServer::start(MockCluster::sample()).await.unwrap();

    let mut cluster = cluster(&server);
    cluster.ca_path = Some("/nonexistent/ca.crt".into());
    let users = vec![
        UserConfig::new("alice", "t", 2),
        UserConfig::new("bob", "t", 2),
    ];
    let report = run(cluster, &users, Duration::from_millis(100)).await;

    assert!(report.stats.is_empty());
    assert_eq!(report.failures.len(), 2);
    assert!(report.failures["alice"].contains("/nonexistent/ca.crt"));
    assert_eq!(server.hits("/api"), 0);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn users_run_with_their_own_concurrency() {
    init();
    let mock = MockCluster::new()
        .core(vec![
            ApiResource::new("pods", true, &["get", "list"]),
            ApiResource::new("services", true, &["get", "list"]),
        ])
        .delay("pods", Duration::from_millis(50))
        .delay("services", Duration::from_millis(50));
    let server = MockServer::start(mock).await.unwrap();

    let users = vec![
        UserConfig::new("wide", "t", 2),
        UserConfig::new("narrow", "t", 1),
    ];
    let report = run(cluster(&server), &users, Duration::from_millis(500)).await;

    let total = |name: &str| -> u64 { report.stats[name].iter().map(|s| s.total_calls).sum() };
    assert!(total("wide") > total("narrow"));
    assert!(total("narrow") <= 11);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn cancellation_stops_every_user() {
    init();
    let server = MockServer::start(MockCluster::sample().delay("pods", Duration::from_millis(20)))
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        canceller.cancel();
    });

    let users = vec![
        UserConfig::new("alice", "t", 2),
        UserConfig::new("bob", "t", 2),
    ];
    let start = tokio::time::Instant::now();
    let report = run_all(
        Arc::new(HttpConnector::new(cluster(&server))),
        &users,
        &[],
        Duration::from_secs(600),
        cancel,
    )
    .await;

    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(report.stats.len(), 2);
    for stats in report.stats.values().flatten() {
        assert!(stats.is_final());
        assert!(stats.elapsed < Duration::from_secs(5));
    }
}

#[test]
fn setup_error_names_the_cause() {
    let err = SetupError::Session("bad CA".into());
    assert!(err.to_string().contains("bad CA"));
}
