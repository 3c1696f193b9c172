#[allow(unused)]
use utils::*;

use kubeload_runtime::{report, KubeloadRuntime, OutputFormat, RuntimeError};
use mock_service::{MockCluster, MockServer};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn config_file(server: &MockServer) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
cluster:
  apiServer: {}
  qps: 100000
  burst: 100000
  ignoreResources:
    - events
    - batch/v1/cronjobs
users:
  - username: bob
    token: bob-token
    concurrency: 2
  - username: alice
    token: alice-token
    concurrency: 4
  - username: eve
    token: stolen
    concurrency: 1
"#,
        server.url()
    )
    .unwrap();
    file
}

async fn server() -> MockServer {
    MockServer::start(
        MockCluster::sample()
            .token("alice-token")
            .token("bob-token")
            .respond("configmaps", 403)
            .respond("jobs", 500),
    )
    .await
    .unwrap()
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn table_report() {
    init();
    let server = server().await;
    let file = config_file(&server);

    let report = KubeloadRuntime::new()
        .config(file.path())
        .duration(Duration::from_millis(200))
        .run()
        .await
        .unwrap();
    let table = report::render(&report, OutputFormat::Table).unwrap();
    let lines: Vec<_> = table.lines().map(str::trim_start).collect();

    assert!(lines[0].starts_with("Username"));
    // alice's rows come first, in catalog order.
    assert!(lines[1].starts_with("alice") && lines[1].contains("v1/pods"));
    let first_bob = lines.iter().position(|l| l.starts_with("bob")).unwrap();
    assert!(lines[1..first_bob].iter().all(|l| l.starts_with("alice")));

    let configmaps = lines
        .iter()
        .find(|l| l.starts_with("alice") && l.contains("v1/configmaps"))
        .unwrap();
    assert_eq!(configmaps.split_whitespace().last(), Some("0.00%"));

    assert!(!table.contains("v1/events"));
    assert!(!table.contains("cronjobs"));
    assert!(table.contains("Failed users:"));
    assert!(table.contains("eve:"));
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn json_report() {
    init();
    let server = server().await;
    let file = config_file(&server);

    let report = KubeloadRuntime::new()
        .config(file.path())
        .duration(Duration::from_millis(200))
        .run()
        .await
        .unwrap();
    let json = report::render(&report, OutputFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    let jobs = value["users"]["bob"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["resource"] == "batch/v1/jobs")
        .unwrap();
    assert_eq!(jobs["errors_5xx"], jobs["total_calls"]);
    assert!(value["failures"]["eve"].as_str().unwrap().contains("401"));
}

#[tokio::test]
async fn invalid_config_is_fatal() {
    init();
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "cluster:\n  apiServer: http://127.0.0.1:1\nusers: []\n").unwrap();

    let res = KubeloadRuntime::new().config(file.path()).run().await;
    assert!(matches!(res, Err(RuntimeError::Config(_))));
}
