//! Seams between the engine and the outside world.
//!
//! The engine never talks to the network itself. A [`Connector`] turns one user's configuration
//! into an authenticated session, and that session provides [`Discovery`] (what can be listed)
//! and [`ResourceClient`] (issue one list call).
use kubeload_core::{ApiResourceList, ResourceKind, UserConfig};
use std::future::Future;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Failure of a single list call. Never fatal; folded into the call statistics.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CallError {
    #[error("Server responded with status {code}: {reason}")]
    Status { code: u16, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Call was cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Discovery request to {path} failed: {source}")]
    Request {
        path: String,
        #[source]
        source: CallError,
    },

    #[error("Unable to decode discovery response from {path}: {reason}")]
    Decode { path: String, reason: String },
}

/// Failure to get a user's run off the ground. Fatal to that user only.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Unable to build session: {0}")]
    Session(String),

    #[error("Resource discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),
}

pub trait Discovery: Send + Sync {
    /// Resources of every group's preferred version, in server order.
    fn server_preferred_resources(
        &self,
    ) -> impl Future<Output = Result<Vec<ApiResourceList>, DiscoveryError>> + Send;
}

pub trait ResourceClient: Send + Sync + 'static {
    /// Issue exactly one list call for `resource`.
    ///
    /// `stop` fires when the run stops. A call still waiting to be sent at that point (on a
    /// client-side throttle, say) returns [`CallError::Cancelled`] without reaching the server;
    /// a call already sent runs to completion.
    fn list(
        &self,
        resource: &ResourceKind,
        stop: &CancellationToken,
    ) -> impl Future<Output = Result<(), CallError>> + Send;
}

pub trait Connector: Send + Sync + 'static {
    type Session: Discovery + ResourceClient;

    fn connect(&self, user: &UserConfig) -> Result<Self::Session, SetupError>;
}
