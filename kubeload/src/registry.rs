use crate::outcome::CallOutcome;
use kubeload_core::{CallStats, ResourceKind};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Per-resource call counters for exactly one run.
///
/// Slots are fixed when the registry is created; each call loop only ever writes to its own
/// slot, and every write is a single atomic increment.
pub struct StatsRegistry {
    slots: Box<[Slot]>,
}

struct Slot {
    resource: String,
    start: Instant,
    total: AtomicU64,
    errors_4xx: AtomicU64,
    errors_5xx: AtomicU64,
    errors_other: AtomicU64,
}

impl Slot {
    fn new(resource: String, start: Instant) -> Self {
        Self {
            resource,
            start,
            total: AtomicU64::new(0),
            errors_4xx: AtomicU64::new(0),
            errors_5xx: AtomicU64::new(0),
            errors_other: AtomicU64::new(0),
        }
    }

    fn record(&self, outcome: CallOutcome) {
        // NOTE: The total is bumped before the error bucket and read after it, which keeps
        // total >= errors in every snapshot.
        self.total.fetch_add(1, Ordering::Release);
        let bucket = match outcome {
            CallOutcome::Success => return,
            CallOutcome::ClientError => &self.errors_4xx,
            CallOutcome::ServerError => &self.errors_5xx,
            CallOutcome::Other => &self.errors_other,
        };
        bucket.fetch_add(1, Ordering::Release);
    }

    fn load(&self) -> CallStats {
        let errors_4xx = self.errors_4xx.load(Ordering::Acquire);
        let errors_5xx = self.errors_5xx.load(Ordering::Acquire);
        let errors_other = self.errors_other.load(Ordering::Acquire);
        let total_calls = self.total.load(Ordering::Acquire);

        CallStats {
            total_calls,
            errors_4xx,
            errors_5xx,
            errors_other,
            ..CallStats::new(self.resource.clone(), self.start)
        }
    }
}

impl StatsRegistry {
    pub fn new<'a>(resources: impl IntoIterator<Item = &'a ResourceKind>, start: Instant) -> Self {
        Self {
            slots: resources
                .into_iter()
                .map(|r| Slot::new(r.id(), start))
                .collect(),
        }
    }

    pub fn record(&self, slot: usize, outcome: CallOutcome) {
        match self.slots.get(slot) {
            Some(slot) => slot.record(outcome),
            None => error!("No stats slot {slot}; dropping {outcome:?}"),
        }
    }

    /// Live view of every resource, in slot order.
    pub fn snapshot(&self) -> Vec<CallStats> {
        self.slots.iter().map(Slot::load).collect()
    }

    /// Final stats with `end` stamped and rates derived. Only meaningful once every writer has
    /// stopped.
    pub fn finalize(&self, end: Instant) -> Vec<CallStats> {
        self.slots
            .iter()
            .map(|slot| {
                let mut stats = slot.load();
                stats.finalize(end);
                stats
            })
            .collect()
    }
}
