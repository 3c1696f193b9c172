use crate::error::RuntimeError;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use kubeload::{CallError, Connector, ResourceClient, SetupError};
use kubeload_core::{ClusterConfig, ResourceKind, UserConfig};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use std::num::NonZeroU32;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// One user's authenticated session against the API server.
///
/// Every request, discovery included, waits on the session's client-side rate limiter first.
pub struct KubeClient {
    http: reqwest::Client,
    base: String,
    limiter: DefaultDirectRateLimiter,
}

impl KubeClient {
    pub fn new(cluster: &ClusterConfig, token: &str) -> Result<Self, RuntimeError> {
        let base = cluster.api_server_url()?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.trim()))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("kubeload/", env!("CARGO_PKG_VERSION")));

        if cluster.insecure {
            warn!("TLS verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        } else if let Some(path) = &cluster.ca_path {
            let pem = std::fs::read(path).map_err(|source| RuntimeError::CaBundle {
                path: path.clone(),
                source,
            })?;
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
        }

        Ok(Self {
            http: builder.build()?,
            base: base.as_str().trim_end_matches('/').to_string(),
            limiter: rate_limiter(cluster.qps(), cluster.burst()),
        })
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Throttled GET of `path`.
    pub(crate) async fn get(&self, path: &str) -> Result<reqwest::Response, CallError> {
        self.limiter.until_ready().await;
        self.send(path).await
    }

    /// Throttled GET of `path` that gives up, unsent, once `stop` fires.
    pub(crate) async fn get_until(
        &self,
        path: &str,
        stop: &CancellationToken,
    ) -> Result<reqwest::Response, CallError> {
        tokio::select! {
            biased;
            _ = stop.cancelled() => return Err(CallError::Cancelled),
            _ = self.limiter.until_ready() => {}
        }
        self.send(path).await
    }

    /// GET `path`, mapping any non-2xx status to [`CallError::Status`].
    async fn send(&self, path: &str) -> Result<reqwest::Response, CallError> {
        let res = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|err| CallError::Transport(err.to_string()))?;

        let status = res.status();
        if status.is_success() {
            Ok(res)
        } else {
            Err(CallError::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            })
        }
    }
}

impl ResourceClient for KubeClient {
    async fn list(
        &self,
        resource: &ResourceKind,
        stop: &CancellationToken,
    ) -> Result<(), CallError> {
        let res = self.get_until(&resource.list_path(), stop).await?;
        // NOTE: Reading the body to the end lets the connection go back to the pool.
        res.bytes()
            .await
            .map_err(|err| CallError::Transport(err.to_string()))?;
        Ok(())
    }
}

/// Token bucket refilled at `qps` with room for `burst` requests.
pub(crate) fn rate_limiter(qps: f32, burst: u32) -> DefaultDirectRateLimiter {
    let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
    let quota = Duration::try_from_secs_f64(1. / f64::from(qps))
        .ok()
        .and_then(Quota::with_period)
        .unwrap_or_else(|| Quota::per_second(NonZeroU32::MAX));
    RateLimiter::direct(quota.allow_burst(burst))
}

/// Builds an HTTP session per user from the shared cluster settings.
#[derive(Clone, Debug)]
pub struct HttpConnector {
    cluster: ClusterConfig,
}

impl HttpConnector {
    pub fn new(cluster: ClusterConfig) -> Self {
        Self { cluster }
    }
}

impl Connector for HttpConnector {
    type Session = KubeClient;

    fn connect(&self, user: &UserConfig) -> Result<KubeClient, SetupError> {
        KubeClient::new(&self.cluster, &user.token).map_err(|err| SetupError::Session(err.to_string()))
    }
}
