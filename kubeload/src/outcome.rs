use crate::client::CallError;
use std::time::Duration;

/// Classification of one finished list call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
    Success,
    /// 4xx status.
    ClientError,
    /// 5xx status.
    ServerError,
    /// Anything else: transport failures, cancellation, unexpected status codes.
    Other,
}

impl CallOutcome {
    pub fn classify<T>(result: &Result<T, CallError>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(CallError::Status { code, .. }) => Self::from_error_status(*code),
            Err(CallError::Transport(_) | CallError::Cancelled) => Self::Other,
        }
    }

    /// Bucket for a status code the server returned as an error.
    pub fn from_error_status(code: u16) -> Self {
        match code {
            400..=499 => Self::ClientError,
            500..=599 => Self::ServerError,
            _ => Self::Other,
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, Self::Success)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::ClientError => "4xx",
            Self::ServerError => "5xx",
            Self::Other => "other",
        }
    }
}

#[cfg(feature = "metrics")]
pub(crate) fn describe_metrics() {
    metrics::describe_counter!("kubeload_calls_total", "List calls issued, by outcome");
    metrics::describe_histogram!(
        "kubeload_call_latency_seconds",
        metrics::Unit::Seconds,
        "Latency of list calls"
    );
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn describe_metrics() {}

#[cfg(feature = "metrics")]
pub(crate) fn record_metrics(resource: &str, outcome: CallOutcome, elapsed: Duration) {
    metrics::counter!(
        "kubeload_calls_total",
        "resource" => resource.to_string(),
        "outcome" => outcome.label()
    )
    .increment(1);
    metrics::histogram!("kubeload_call_latency_seconds", "resource" => resource.to_string())
        .record(elapsed.as_secs_f64());
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn record_metrics(_resource: &str, _outcome: CallOutcome, _elapsed: Duration) {}
