#[allow(unused)]
use utils::*;

use kubeload_core::{ApiResource, ApiResourceList, UserConfig};
use mock_service::{MockCluster, MockServer};
use std::time::Duration;

#[tokio::test]
#[ntest::timeout(10_000)]
async fn discovery_drives_load() {
    init();
    let server = MockServer::start(MockCluster::sample()).await.unwrap();

    let users = vec![UserConfig::new("alice", "t", 4)];
    let report = run(cluster(&server), &users, Duration::from_millis(300)).await;

    assert!(report.failures.is_empty());
    let alice = &report.stats["alice"];
    assert_eq!(
        resources(alice),
        vec![
            "v1/pods",
            "v1/services",
            "v1/configmaps",
            "v1/events",
            "v1/nodes",
            "v1/namespaces",
            "apps/v1/deployments",
            "apps/v1/replicasets",
            "batch/v1/jobs",
            "batch/v1/cronjobs",
        ]
    );

    // Every call the server saw was counted, including the ones in flight at the deadline.
    for stats in alice {
        let name = stats.resource.rsplit('/').next().unwrap();
        assert!(stats.total_calls > 0, "{} never called", stats.resource);
        assert_eq!(stats.errors_4xx + stats.errors_5xx, 0);
        assert!(stats.is_final());
        assert_eq!(server.list_hits(name), stats.total_calls - stats.errors_other);
    }

    // Namespaced kinds are listed under the default namespace, cluster kinds are not.
    assert!(server.hits("/api/v1/namespaces/default/pods") > 0);
    assert!(server.hits("/api/v1/nodes") > 0);
    assert!(server.hits("/apis/batch/v1/namespaces/default/jobs") > 0);

    // Subresources, create-only kinds and non-preferred versions are never called.
    assert_eq!(server.list_hits("pods/log"), 0);
    assert_eq!(server.list_hits("bindings"), 0);
    assert_eq!(server.hits("/apis/apps/v1beta1"), 0);
    assert_eq!(server.hits("/apis/apps/v1beta1/namespaces/default/deployments"), 0);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn malformed_group_version_is_skipped() {
    init();
    let server = MockServer::start(MockCluster::sample().raw_group(
        "broken",
        "v1",
        ApiResourceList {
            group_version: "broken/group/v1".into(),
            resources: vec![ApiResource::new("widgets", true, &["get", "list"])],
        },
    ))
    .await
    .unwrap();

    let users = vec![UserConfig::new("alice", "t", 2)];
    let report = run(cluster(&server), &users, Duration::from_millis(100)).await;

    let alice = &report.stats["alice"];
    assert_eq!(alice.len(), 10);
    assert!(!alice.iter().any(|s| s.resource.contains("widgets")));
    assert_eq!(server.list_hits("widgets"), 0);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn exclusions_apply_by_name_and_group_version() {
    init();
    let server = MockServer::start(MockCluster::sample()).await.unwrap();

    let mut cluster = cluster(&server);
    cluster.ignore_resources = vec!["Events".into(), "apps/v1/deployments".into()];
    let users = vec![UserConfig::new("alice", "t", 2)];
    let report = run(cluster, &users, Duration::from_millis(100)).await;

    let alice = resources(&report.stats["alice"]);
    assert!(!alice.contains(&"v1/events"));
    assert!(!alice.contains(&"apps/v1/deployments"));
    assert!(alice.contains(&"apps/v1/replicasets"));
    assert_eq!(server.list_hits("events"), 0);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn everything_excluded_reports_nothing() {
    init();
    let server = MockServer::start(
        MockCluster::new().core(vec![ApiResource::new("pods", true, &["get", "list"])]),
    )
    .await
    .unwrap();

    let mut cluster = cluster(&server);
    cluster.ignore_resources = vec!["pods".into()];
    let users = vec![UserConfig::new("alice", "t", 2)];

    let start = tokio::time::Instant::now();
    let report = run(cluster, &users, Duration::from_secs(30)).await;

    assert!(start.elapsed() < Duration::from_secs(5));
    assert!(report.failures.is_empty());
    assert!(report.stats["alice"].is_empty());
}
