use std::time::Duration;

/// Client-side request rate used when `cluster.qps` is unset or zero.
pub const DEFAULT_QPS: f32 = 50.;

/// Client-side burst used when `cluster.burst` is unset or zero.
pub const DEFAULT_BURST: u32 = 100;

/// Namespace that namespaced list calls are scoped to.
pub const DEFAULT_NAMESPACE: &str = "default";

pub const DEFAULT_DURATION: Duration = Duration::from_secs(5 * 60);
