//! A small stand-in for a Kubernetes API server.
//!
//! Serves the discovery endpoints (`/api`, `/apis` and the per group-version resource lists)
//! plus empty list responses for every advertised resource. Per-resource status codes and
//! latencies can be injected, and every request is counted so tests can assert on traffic.
use axum::{
    debug_handler,
    extract::{Path, Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use kubeload_core::{ApiResource, ApiResourceList};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
#[allow(unused)]
use tracing::{debug, error, info};

#[derive(Clone, Debug)]
struct MockGroup {
    name: String,
    /// Version and the list served for it, in advertised order.
    versions: Vec<(String, ApiResourceList)>,
    advertise_preferred: bool,
}

#[derive(Clone, Copy, Debug)]
struct Behavior {
    status: u16,
    delay: Duration,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            status: 200,
            delay: Duration::ZERO,
        }
    }
}

/// What the mock API server advertises and how it answers.
#[derive(Clone, Debug)]
pub struct MockCluster {
    core_version: String,
    core: Vec<ApiResource>,
    groups: Vec<MockGroup>,
    behaviors: HashMap<String, Behavior>,
    discovery_status: HashMap<String, u16>,
    tokens: HashSet<String>,
}

impl Default for MockCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCluster {
    /// An empty `v1` core group and no named groups.
    pub fn new() -> Self {
        Self {
            core_version: "v1".to_string(),
            core: vec![],
            groups: vec![],
            behaviors: HashMap::new(),
            discovery_status: HashMap::new(),
            tokens: HashSet::new(),
        }
    }

    /// A small but realistic cluster: core `v1`, `apps` in two versions and `batch/v1`, with
    /// subresources and non-listable resources mixed in.
    pub fn sample() -> Self {
        Self::new()
            .core(vec![
                ApiResource::new("pods", true, &["create", "delete", "get", "list", "watch"]),
                ApiResource::new("pods/log", true, &["get"]),
                ApiResource::new("services", true, &["get", "list", "watch"]),
                ApiResource::new("configmaps", true, &["get", "list"]),
                ApiResource::new("events", true, &["get", "list"]),
                ApiResource::new("bindings", true, &["create"]),
                ApiResource::new("nodes", false, &["get", "list"]),
                ApiResource::new("namespaces", false, &["get", "list"]),
            ])
            .group(
                "apps",
                "v1",
                vec![
                    ApiResource::new("deployments", true, &["get", "list", "watch"]),
                    ApiResource::new("deployments/scale", true, &["get", "update"]),
                    ApiResource::new("replicasets", true, &["get", "list"]),
                ],
            )
            .group(
                "apps",
                "v1beta1",
                vec![ApiResource::new("deployments", true, &["get", "list"])],
            )
            .group(
                "batch",
                "v1",
                vec![
                    ApiResource::new("jobs", true, &["get", "list"]),
                    ApiResource::new("cronjobs", true, &["get", "list"]),
                ],
            )
    }

    pub fn core(mut self, resources: Vec<ApiResource>) -> Self {
        self.core = resources;
        self
    }

    /// Adds a version to a named group. The first version added is the preferred one.
    pub fn group(mut self, name: &str, version: &str, resources: Vec<ApiResource>) -> Self {
        let list = ApiResourceList {
            group_version: format!("{name}/{version}"),
            resources,
        };
        self.push_version(name, version, list, true);
        self
    }

    /// Adds a single-version group that does not advertise a preferred version.
    pub fn group_without_preference(
        mut self,
        name: &str,
        version: &str,
        resources: Vec<ApiResource>,
    ) -> Self {
        let list = ApiResourceList {
            group_version: format!("{name}/{version}"),
            resources,
        };
        self.push_version(name, version, list, false);
        self
    }

    /// Serves `list` verbatim for `/apis/{name}/{version}`, whatever group-version it claims.
    pub fn raw_group(mut self, name: &str, version: &str, list: ApiResourceList) -> Self {
        self.push_version(name, version, list, true);
        self
    }

    fn push_version(&mut self, name: &str, version: &str, list: ApiResourceList, preferred: bool) {
        match self.groups.iter_mut().find(|g| g.name == name) {
            Some(group) => group.versions.push((version.to_string(), list)),
            None => self.groups.push(MockGroup {
                name: name.to_string(),
                versions: vec![(version.to_string(), list)],
                advertise_preferred: preferred,
            }),
        }
    }

    /// List calls for `resource` answer with `status`.
    pub fn respond(mut self, resource: &str, status: u16) -> Self {
        self.behaviors.entry(resource.to_string()).or_default().status = status;
        self
    }

    /// List calls for `resource` take `delay` before answering.
    pub fn delay(mut self, resource: &str, delay: Duration) -> Self {
        self.behaviors.entry(resource.to_string()).or_default().delay = delay;
        self
    }

    /// The resource list for `group_version` answers with `status`.
    pub fn respond_discovery(mut self, group_version: &str, status: u16) -> Self {
        self.discovery_status
            .insert(group_version.to_string(), status);
        self
    }

    /// Only bearer tokens registered here are accepted once any is registered.
    pub fn token(mut self, token: &str) -> Self {
        self.tokens.insert(token.to_string());
        self
    }

    fn find_group(&self, name: &str, version: &str) -> Option<&ApiResourceList> {
        self.groups
            .iter()
            .find(|g| g.name == name)?
            .versions
            .iter()
            .find(|(v, _)| v == version)
            .map(|(_, list)| list)
    }
}

struct MockState {
    cluster: MockCluster,
    hits: Mutex<HashMap<String, u64>>,
    list_hits: Mutex<HashMap<String, u64>>,
    last_list: Mutex<Option<Instant>>,
}

impl MockState {
    fn new(cluster: MockCluster) -> Self {
        Self {
            cluster,
            hits: Mutex::new(HashMap::new()),
            list_hits: Mutex::new(HashMap::new()),
            last_list: Mutex::new(None),
        }
    }
}

fn bump(counter: &Mutex<HashMap<String, u64>>, key: &str) {
    let mut counter = counter.lock().unwrap_or_else(PoisonError::into_inner);
    *counter.entry(key.to_string()).or_default() += 1;
}

fn count(counter: &Mutex<HashMap<String, u64>>, key: &str) -> u64 {
    let counter = counter.lock().unwrap_or_else(PoisonError::into_inner);
    counter.get(key).copied().unwrap_or_default()
}

fn status_response(status: u16) -> Response {
    let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "reason": code.canonical_reason().unwrap_or_default(),
        "code": code.as_u16(),
    });
    (code, Json(body)).into_response()
}

pub fn router(cluster: MockCluster) -> Router {
    app(Arc::new(MockState::new(cluster)))
}

fn app(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/api", get(api_versions))
        .route("/api/:version", get(core_resources))
        .route("/api/:version/:resource", get(core_list))
        .route("/api/:version/namespaces/:namespace/:resource", get(core_namespaced_list))
        .route("/apis", get(api_groups))
        .route("/apis/:group/:version", get(group_resources))
        .route("/apis/:group/:version/:resource", get(group_list))
        .route(
            "/apis/:group/:version/namespaces/:namespace/:resource",
            get(group_namespaced_list),
        )
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn authenticate(State(state): State<Arc<MockState>>, req: Request, next: Next) -> Response {
    bump(&state.hits, req.uri().path());

    if !state.cluster.tokens.is_empty() {
        let token = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        if !token.is_some_and(|t| state.cluster.tokens.contains(t)) {
            debug!("Rejecting unauthenticated request to {}", req.uri().path());
            return status_response(401);
        }
    }

    next.run(req).await
}

#[debug_handler]
async fn api_versions(State(state): State<Arc<MockState>>) -> Response {
    Json(json!({
        "kind": "APIVersions",
        "versions": [state.cluster.core_version],
    }))
    .into_response()
}

#[debug_handler]
async fn api_groups(State(state): State<Arc<MockState>>) -> Response {
    let groups: Vec<_> = state
        .cluster
        .groups
        .iter()
        .map(|group| {
            let versions: Vec<_> = group
                .versions
                .iter()
                .map(|(v, _)| json!({"groupVersion": format!("{}/{v}", group.name), "version": v}))
                .collect();
            let preferred = versions.first().cloned();
            let mut body = json!({"name": group.name, "versions": versions});
            if let Some(preferred) = preferred.filter(|_| group.advertise_preferred) {
                body["preferredVersion"] = preferred;
            }
            body
        })
        .collect();

    Json(json!({"kind": "APIGroupList", "groups": groups})).into_response()
}

#[debug_handler]
async fn core_resources(
    State(state): State<Arc<MockState>>,
    Path(version): Path<String>,
) -> Response {
    if let Some(status) = state.cluster.discovery_status.get(&version) {
        return status_response(*status);
    }
    if version != state.cluster.core_version {
        return status_response(404);
    }

    Json(ApiResourceList {
        group_version: version,
        resources: state.cluster.core.clone(),
    })
    .into_response()
}

#[debug_handler]
async fn group_resources(
    State(state): State<Arc<MockState>>,
    Path((group, version)): Path<(String, String)>,
) -> Response {
    if let Some(status) = state.cluster.discovery_status.get(&format!("{group}/{version}")) {
        return status_response(*status);
    }

    match state.cluster.find_group(&group, &version) {
        Some(list) => Json(list.clone()).into_response(),
        None => status_response(404),
    }
}

async fn list(state: &MockState, resource: &str) -> Response {
    bump(&state.list_hits, resource);
    *state
        .last_list
        .lock()
        .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());

    let behavior = state
        .cluster
        .behaviors
        .get(resource)
        .copied()
        .unwrap_or_default();
    if !behavior.delay.is_zero() {
        tokio::time::sleep(behavior.delay).await;
    }

    if behavior.status >= 300 {
        return status_response(behavior.status);
    }

    let code = StatusCode::from_u16(behavior.status).unwrap_or(StatusCode::OK);
    let body = json!({"kind": "List", "apiVersion": "v1", "metadata": {}, "items": []});
    (code, Json(body)).into_response()
}

async fn core_list(
    State(state): State<Arc<MockState>>,
    Path((_version, resource)): Path<(String, String)>,
) -> Response {
    list(&state, &resource).await
}

async fn core_namespaced_list(
    State(state): State<Arc<MockState>>,
    Path((_version, _namespace, resource)): Path<(String, String, String)>,
) -> Response {
    list(&state, &resource).await
}

async fn group_list(
    State(state): State<Arc<MockState>>,
    Path((_group, _version, resource)): Path<(String, String, String)>,
) -> Response {
    list(&state, &resource).await
}

async fn group_namespaced_list(
    State(state): State<Arc<MockState>>,
    Path((_group, _version, _namespace, resource)): Path<(String, String, String, String)>,
) -> Response {
    list(&state, &resource).await
}

/// Serves `cluster` on `addr` until the process exits.
pub async fn run(addr: SocketAddr, cluster: MockCluster) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("Mock API server listening on {}", listener.local_addr()?);
    axum::serve(listener, router(cluster)).await?;
    Ok(())
}

/// A mock API server on an ephemeral local port, shut down on drop.
pub struct MockServer {
    addr: SocketAddr,
    state: Arc<MockState>,
    task: JoinHandle<()>,
}

impl MockServer {
    pub async fn start(cluster: MockCluster) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(MockState::new(cluster));

        let app = app(state.clone());
        let task = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                error!("Mock API server failed: {err}");
            }
        });

        Ok(Self { addr, state, task })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests seen for an exact path, rejected ones included.
    pub fn hits(&self, path: &str) -> u64 {
        count(&self.state.hits, path)
    }

    /// List calls seen for a resource name, across every group-version and namespace.
    pub fn list_hits(&self, resource: &str) -> u64 {
        count(&self.state.list_hits, resource)
    }

    pub fn total_list_hits(&self) -> u64 {
        let counter = self
            .state
            .list_hits
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        counter.values().sum()
    }

    /// When the most recent list call arrived.
    pub fn last_list_hit(&self) -> Option<Instant> {
        *self
            .state
            .last_list
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
