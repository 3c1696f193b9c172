use serde::Serialize;
use serde_with::{serde_as, DurationSecondsWithFrac};
use std::time::Duration;
use tokio::time::Instant;

/// Call statistics for one resource kind within one run.
///
/// Live snapshots have no `end` and a zero `calls_per_sec`; both are set once the run has
/// finalized.
#[serde_as]
#[derive(Clone, Debug, Serialize)]
pub struct CallStats {
    pub resource: String,
    pub total_calls: u64,
    pub errors_4xx: u64,
    pub errors_5xx: u64,
    pub errors_other: u64,
    #[serde(skip)]
    pub start: Instant,
    #[serde(skip)]
    pub end: Option<Instant>,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub elapsed: Duration,
    pub calls_per_sec: f64,
}

impl CallStats {
    pub fn new(resource: impl Into<String>, start: Instant) -> Self {
        Self {
            resource: resource.into(),
            total_calls: 0,
            errors_4xx: 0,
            errors_5xx: 0,
            errors_other: 0,
            start,
            end: None,
            elapsed: Duration::ZERO,
            calls_per_sec: 0.,
        }
    }

    /// Stamps the end of the run and derives the call rate.
    pub fn finalize(&mut self, end: Instant) {
        self.end = Some(end);
        self.elapsed = end.saturating_duration_since(self.start);
        self.calls_per_sec = calls_per_sec(self.total_calls, self.elapsed);
    }

    pub fn is_final(&self) -> bool {
        self.end.is_some()
    }

    pub fn errors(&self) -> u64 {
        self.errors_4xx + self.errors_5xx + self.errors_other
    }

    /// Fraction of calls that succeeded, `None` when no call was made.
    pub fn success_rate(&self) -> Option<f64> {
        if self.total_calls == 0 {
            return None;
        }
        let ok = self.total_calls.saturating_sub(self.errors());
        Some(ok as f64 / self.total_calls as f64)
    }
}

pub fn calls_per_sec(total_calls: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0. {
        total_calls as f64 / secs
    } else {
        0.
    }
}
