#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod catalog;
pub mod client;
pub mod coordinator;
pub mod engine;
pub mod outcome;
pub mod registry;

pub use catalog::ResourceCatalog;
pub use client::{CallError, Connector, Discovery, DiscoveryError, ResourceClient, SetupError};
pub use coordinator::{run_all, RunCoordinator, RunReport, RunResult};
pub use engine::{LoadEngine, RunState};
pub use outcome::CallOutcome;
pub use registry::StatsRegistry;

pub mod prelude {
    pub use crate::client::{Connector, Discovery, ResourceClient};
    pub use crate::coordinator::{run_all, RunReport};
    pub use crate::engine::LoadEngine;
    pub use kubeload_core::{CallStats, Config, ResourceKind, UserConfig};
    pub use tokio_util::sync::CancellationToken;
}
