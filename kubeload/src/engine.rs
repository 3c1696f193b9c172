//! The load engine: one call loop per resource, all sharing one concurrency limiter.
use crate::client::ResourceClient;
use crate::outcome::{self, CallOutcome};
use crate::registry::StatsRegistry;
use arc_swap::ArcSwapOption;
use kubeload_core::{CallStats, ResourceKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    /// Deadline passed or cancelled; in-flight calls are finishing.
    Draining,
    Finalized,
}

/// Drives concurrent list calls for one user's resources.
///
/// All loops of a run share a single pool of `concurrency` permits, so the number of calls in
/// flight across every resource never exceeds it.
///
/// # Example
/// ```ignore
/// let engine = LoadEngine::new(Arc::new(client), 4);
/// let stats = engine.run(&resources, Duration::from_secs(60)).await;
/// ```
pub struct LoadEngine<C> {
    client: Arc<C>,
    concurrency: usize,
    cancel: CancellationToken,
    state: watch::Sender<RunState>,
    registry: ArcSwapOption<StatsRegistry>,
}

impl<C: ResourceClient> LoadEngine<C> {
    pub fn new(client: Arc<C>, concurrency: usize) -> Self {
        let (state, _) = watch::channel(RunState::Idle);
        Self {
            client,
            concurrency,
            cancel: CancellationToken::new(),
            state,
            registry: ArcSwapOption::empty(),
        }
    }

    /// Cancelling `cancel` drains the run exactly like the deadline does.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Live stats of the current (or last) run, `None` before the first run starts.
    pub fn progress(&self) -> Option<Vec<CallStats>> {
        self.registry.load().as_ref().map(|r| r.snapshot())
    }

    /// Runs every resource's call loop until `duration` elapses or the run is cancelled, then
    /// waits for in-flight calls and returns the finalized stats in `resources` order.
    #[instrument(name = "engine", skip_all, fields(resources = resources.len(), concurrency = self.concurrency))]
    pub async fn run(&self, resources: &[ResourceKind], duration: Duration) -> Vec<CallStats> {
        let start = Instant::now();
        let stop = StopSignal {
            deadline: start + duration,
            cancel: self.cancel.child_token(),
        };

        let registry = Arc::new(StatsRegistry::new(resources, start));
        self.registry.store(Some(registry.clone()));
        self.state.send_replace(RunState::Running);
        outcome::describe_metrics();
        info!(
            "Running {} call loops for {}",
            resources.len(),
            humantime::format_duration(duration)
        );

        let limiter = Arc::new(Semaphore::new(self.concurrency));
        let mut loops = JoinSet::new();
        for (slot, resource) in resources.iter().enumerate() {
            let call_loop = CallLoop {
                client: self.client.clone(),
                resource: resource.clone(),
                slot,
                registry: registry.clone(),
                limiter: limiter.clone(),
                stop: stop.clone(),
            };
            loops.spawn(call_loop.run().in_current_span());
        }

        if !loops.is_empty() {
            stop.stopped().await;
        }
        // NOTE: Calls that have not been sent yet observe the deadline through this token.
        stop.cancel.cancel();

        self.state.send_replace(RunState::Draining);
        debug!("Draining in-flight calls");
        while let Some(res) = loops.join_next().await {
            if let Err(err) = res {
                error!("Call loop failed: {err}");
            }
        }

        let stats = registry.finalize(Instant::now());
        self.state.send_replace(RunState::Finalized);
        info!("Run complete");
        stats
    }
}

/// Deadline plus external cancellation, shared by every loop of one run.
///
/// `cancel` is a child of the engine's token, so cancelling it at the deadline never leaks
/// into other users' runs.
#[derive(Clone)]
struct StopSignal {
    deadline: Instant,
    cancel: CancellationToken,
}

impl StopSignal {
    fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled() || Instant::now() >= self.deadline
    }

    async fn stopped(&self) {
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = sleep_until(self.deadline) => {}
        }
    }
}

struct CallLoop<C> {
    client: Arc<C>,
    resource: ResourceKind,
    slot: usize,
    registry: Arc<StatsRegistry>,
    limiter: Arc<Semaphore>,
    stop: StopSignal,
}

impl<C: ResourceClient> CallLoop<C> {
    async fn run(self) {
        let id = self.resource.id();
        trace!("Starting call loop for {id}");

        loop {
            if self.stop.is_stopped() {
                break;
            }

            let _permit = tokio::select! {
                biased;
                _ = self.stop.stopped() => break,
                permit = self.limiter.acquire() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            // NOTE: The stop may have landed while we were queued on the limiter.
            if self.stop.is_stopped() {
                break;
            }

            // A call already sent when the run stops is allowed to finish and is still counted.
            let call_start = Instant::now();
            let res = self.client.list(&self.resource, &self.stop.cancel).await;
            let outcome = CallOutcome::classify(&res);
            self.registry.record(self.slot, outcome);
            outcome::record_metrics(&id, outcome, call_start.elapsed());

            if let Err(err) = res {
                trace!("List {id} failed: {err}");
            }
        }

        trace!("Call loop for {id} stopped");
    }
}
