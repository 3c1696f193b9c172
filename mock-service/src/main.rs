use mock_service::MockCluster;
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mock_service=info,tower_http=debug")),
        )
        .init();

    let addr: SocketAddr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:3000".to_string())
        .parse()?;

    // Some friction so a local run shows every outcome bucket.
    let cluster = MockCluster::sample()
        .delay("pods", Duration::from_millis(10))
        .delay("deployments", Duration::from_millis(25))
        .respond("configmaps", 403)
        .respond("jobs", 503);

    mock_service::run(addr, cluster).await
}
