//! HTTP transport, configuration loading and the `kubeload` command line.
//!
//! [`KubeloadRuntime`] ties everything together: it reads the YAML config, builds one
//! [`KubeClient`] per user through [`HttpConnector`], runs [`kubeload::run_all`], and renders
//! the resulting [`kubeload::RunReport`].
mod client;
mod discovery;
mod error;
pub mod report;
mod runtime;

pub use client::{HttpConnector, KubeClient};
pub use error::RuntimeError;
pub use report::OutputFormat;
pub use runtime::{load_config, KubeloadRuntime};
