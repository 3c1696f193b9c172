#[allow(unused)]
use utils::*;

use kubeload_core::{ApiResource, UserConfig};
use mock_service::{MockCluster, MockServer};
use std::time::Duration;

#[tokio::test]
#[ntest::timeout(10_000)]
async fn statuses_land_in_buckets() {
    init();
    let server = MockServer::start(
        MockCluster::sample()
            .respond("configmaps", 403)
            .respond("jobs", 503)
            .respond("cronjobs", 302)
            .delay("pods", Duration::from_millis(5)),
    )
    .await
    .unwrap();

    let users = vec![UserConfig::new("alice", "t", 4)];
    let report = run(cluster(&server), &users, Duration::from_millis(300)).await;
    let alice = &report.stats["alice"];

    let configmaps = find(alice, "v1/configmaps");
    assert!(configmaps.total_calls > 0);
    assert_eq!(configmaps.errors_4xx, configmaps.total_calls);
    assert_eq!(configmaps.success_rate(), Some(0.));

    let jobs = find(alice, "batch/v1/jobs");
    assert!(jobs.total_calls > 0);
    assert_eq!(jobs.errors_5xx, jobs.total_calls);

    // Anything that is neither a success, a 4xx nor a 5xx is "other".
    let cronjobs = find(alice, "batch/v1/cronjobs");
    assert!(cronjobs.total_calls > 0);
    assert_eq!(cronjobs.errors_other, cronjobs.total_calls);

    let pods = find(alice, "v1/pods");
    assert!(pods.total_calls > 0);
    assert_eq!(pods.errors(), 0);
    assert_eq!(pods.success_rate(), Some(1.));
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn qps_caps_the_session() {
    init();
    let server = MockServer::start(MockCluster::sample()).await.unwrap();

    let mut cluster = cluster(&server);
    cluster.qps = 20.;
    cluster.burst = 1;
    let users = vec![UserConfig::new("alice", "t", 8)];
    let duration = Duration::from_secs(1);
    let report = run(cluster, &users, duration).await;
    let alice = &report.stats["alice"];

    // Every permit holder queues on the limiter; the ones still queued at the deadline are
    // dropped unsent and land in the other bucket.
    let total: u64 = alice.iter().map(|s| s.total_calls).sum();
    let dropped: u64 = alice.iter().map(|s| s.errors_other).sum();
    let sent = server.total_list_hits();
    assert_eq!(sent, total - dropped);
    assert!(sent > 5, "{sent}");
    assert!(sent <= 21, "{sent}");

    let deadline = alice[0].start.into_std() + duration;
    let last = server.last_list_hit().unwrap();
    assert!(last < deadline + Duration::from_millis(50));
    assert!(alice[0].elapsed < duration + Duration::from_millis(200));
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn throttled_call_never_outlives_deadline() {
    init();
    let server = MockServer::start(
        MockCluster::new().core(vec![ApiResource::new("pods", true, &["get", "list"])]),
    )
    .await
    .unwrap();

    // Discovery drains the bucket; the first list call would wait a full second.
    let mut cluster = cluster(&server);
    cluster.qps = 1.;
    cluster.burst = 1;
    let users = vec![UserConfig::new("alice", "t", 1)];
    let report = run(cluster, &users, Duration::from_millis(200)).await;

    let pods = find(&report.stats["alice"], "v1/pods");
    assert_eq!(server.list_hits("pods"), 0);
    assert_eq!(pods.total_calls, 1);
    assert_eq!(pods.errors_other, 1);
    assert!(pods.elapsed < Duration::from_millis(500), "{:?}", pods.elapsed);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn slow_server_bounds_throughput_by_concurrency() {
    init();
    let mock = MockCluster::new()
        .core(vec![
            ApiResource::new("pods", true, &["get", "list"]),
            ApiResource::new("services", true, &["get", "list"]),
        ])
        .delay("pods", Duration::from_millis(50))
        .delay("services", Duration::from_millis(50));
    let server = MockServer::start(mock).await.unwrap();

    let users = vec![UserConfig::new("alice", "t", 1)];
    let report = run(cluster(&server), &users, Duration::from_millis(500)).await;

    // One permit and 50ms per call: at most 11 calls in 500ms, whatever the resource count.
    let total: u64 = report.stats["alice"].iter().map(|s| s.total_calls).sum();
    assert!(total <= 11, "{total}");
    assert!(total >= 5, "{total}");
}
