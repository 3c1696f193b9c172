use kubeload_runtime::{report, KubeloadRuntime};
use std::process::ExitCode;
#[allow(unused)]
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kubeload=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let runtime = KubeloadRuntime::new().with_args();
    let format = runtime.output_format();

    let cancel = runtime.cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; draining in-flight calls");
            cancel.cancel();
        }
    });

    let report = match runtime.run().await {
        Ok(report) => report,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };

    match report::render(&report, format) {
        Ok(out) => println!("{}", out.trim_end()),
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    }

    // NOTE: Partial failures still print a report; only a run where nobody got going fails.
    if report.stats.is_empty() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
