//! Default kubeload runtime
//!
//! Loads the YAML configuration, builds the HTTP connector for the configured cluster and
//! drives one coordinator per user until the run duration elapses or the run is cancelled.
use crate::client::HttpConnector;
use crate::error::RuntimeError;
use crate::report::OutputFormat;
use clap::Parser;
use kubeload::{run_all, RunReport};
use kubeload_core::{Config, DEFAULT_DURATION};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
#[allow(unused)]
use tracing::{debug, error, info, instrument, warn};

#[derive(Parser, Debug)]
#[command(name = "kubeload", version, about = "Multi-user list-call load generator for Kubernetes API servers")]
struct KubeloadCli {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// How long to generate load for, e.g. `30s` or `5m`.
    #[arg(short, long, default_value = "5m", value_parser = humantime::parse_duration)]
    duration: Duration,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

/// Default kubeload runtime.
///
/// # Example
///
/// ```ignore
/// use kubeload_runtime::KubeloadRuntime;
///
/// #[tokio::main]
/// async fn main() {
///     let report = KubeloadRuntime::new()
///         .with_args()
///         .run()
///         .await
///         .unwrap();
/// }
/// ```
pub struct KubeloadRuntime {
    config_path: Option<PathBuf>,
    duration: Duration,
    format: OutputFormat,
    cancel: CancellationToken,
}

impl Default for KubeloadRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl KubeloadRuntime {
    pub fn new() -> Self {
        KubeloadRuntime {
            config_path: None,
            duration: DEFAULT_DURATION,
            format: OutputFormat::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Use the default CLI arguments for kubeload.
    ///
    /// `-c`, `--config` path to the YAML configuration (required)
    ///
    /// `-d`, `--duration` run duration in humantime format (default `5m`)
    ///
    /// `-f`, `--format` `table` or `json` (default `table`)
    ///
    /// # Example
    /// ```ignore
    /// $ kubeload --config load.yaml --duration 30s
    /// $ kubeload -c load.yaml -f json
    /// ```
    pub fn with_args(mut self) -> Self {
        let args = KubeloadCli::parse();
        self.config_path = Some(args.config);
        self.duration = args.duration;
        self.format = args.format;
        self
    }

    pub fn config(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output_format(&self) -> OutputFormat {
        self.format
    }

    /// Cancelling this token drains every user's run early.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[instrument(name = "kubeload", skip_all)]
    pub async fn run(self) -> Result<RunReport, RuntimeError> {
        let path = self.config_path.ok_or(RuntimeError::NoConfig)?;
        let config = load_config(&path)?;

        info!(
            "Starting load against {} with {} users for {}",
            config.cluster.api_server,
            config.users.len(),
            humantime::format_duration(self.duration)
        );
        let start = Instant::now();

        let connector = Arc::new(HttpConnector::new(config.cluster.clone()));
        let report = run_all(
            connector,
            &config.users,
            &config.cluster.ignore_resources,
            self.duration,
            self.cancel,
        )
        .await;

        info!(
            "Load test finished in {:.2}s; {} users ran, {} failed",
            start.elapsed().as_secs_f64(),
            report.stats.len(),
            report.failures.len()
        );
        Ok(report)
    }
}

/// Reads and validates a configuration file.
pub fn load_config(path: &Path) -> Result<Config, RuntimeError> {
    let content = std::fs::read_to_string(path).map_err(|source| RuntimeError::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;
    let config: Config = serde_yaml::from_str(&content)?;
    config.validate()?;
    debug!("Loaded config {config:?}");
    Ok(config)
}
