use crate::catalog::ResourceCatalog;
use crate::client::{Connector, SetupError};
use crate::engine::LoadEngine;
use futures_util::FutureExt;
use kubeload_core::{CallStats, UserConfig};
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
#[allow(unused)]
use tracing::{debug, error, info, instrument, warn, Instrument};

/// Finalized stats for one user, in catalog order.
pub type RunResult = Vec<CallStats>;

/// Everything a multi-user run produced.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Username to finalized stats, for every user whose setup succeeded.
    pub stats: BTreeMap<String, RunResult>,
    /// Username to setup error message.
    pub failures: BTreeMap<String, String>,
}

/// Owns one user's run end to end: session, discovery, and a single load engine.
pub struct RunCoordinator<K> {
    connector: Arc<K>,
    catalog: Arc<ResourceCatalog>,
    user: UserConfig,
    duration: Duration,
    cancel: CancellationToken,
}

impl<K: Connector> RunCoordinator<K> {
    pub fn new(
        connector: Arc<K>,
        catalog: Arc<ResourceCatalog>,
        user: UserConfig,
        duration: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            connector,
            catalog,
            user,
            duration,
            cancel,
        }
    }

    #[instrument(name = "user", skip_all, fields(username = %self.user.username))]
    pub async fn run(self) -> Result<RunResult, SetupError> {
        let session = Arc::new(self.connector.connect(&self.user)?);
        let resources = self.catalog.discover(session.as_ref()).await?;
        if resources.is_empty() {
            warn!("No eligible resources");
        } else {
            info!("Discovered {} eligible resources", resources.len());
        }

        let engine =
            LoadEngine::new(session, self.user.concurrency).with_cancellation(self.cancel);
        Ok(engine.run(&resources, self.duration).await)
    }
}

/// Runs one coordinator per user concurrently and waits for all of them.
///
/// A user whose setup fails is logged and recorded in [`RunReport::failures`]; it never affects
/// the other users.
pub async fn run_all<K: Connector>(
    connector: Arc<K>,
    users: &[UserConfig],
    exclusions: &[String],
    duration: Duration,
    cancel: CancellationToken,
) -> RunReport {
    let catalog = Arc::new(ResourceCatalog::new(exclusions));

    let mut coordinators = JoinSet::new();
    for user in users {
        let username = user.username.clone();
        let coordinator = RunCoordinator::new(
            connector.clone(),
            catalog.clone(),
            user.clone(),
            duration,
            cancel.clone(),
        );
        coordinators.spawn(
            async move {
                let result = AssertUnwindSafe(coordinator.run()).catch_unwind().await;
                (username, result)
            }
            .in_current_span(),
        );
    }

    let mut report = RunReport::default();
    while let Some(joined) = coordinators.join_next().await {
        match joined {
            Ok((username, Ok(Ok(stats)))) => {
                report.stats.insert(username, stats);
            }
            Ok((username, Ok(Err(err)))) => {
                error!("Error running load for user {username}: {err}");
                report.failures.insert(username, err.to_string());
            }
            Ok((username, Err(panic))) => {
                let reason = format!("Coordinator panicked: {}", panic_message(&*panic));
                error!("Error running load for user {username}: {reason}");
                report.failures.insert(username, reason);
            }
            // NOTE: Only reachable if the runtime shuts down underneath us.
            Err(err) => error!("Coordinator task failed: {err}"),
        }
    }
    report
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        *msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown cause"
    }
}
