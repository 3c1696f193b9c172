//! Rendering of a finished [`RunReport`].
use crate::error::RuntimeError;
use kubeload::RunReport;
use kubeload_core::CallStats;
use serde::Serialize;
use std::collections::BTreeMap;
use tabled::settings::{object::Columns, Alignment, Modify, Style};
use tabled::{Table, Tabled};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

pub fn render(report: &RunReport, format: OutputFormat) -> Result<String, RuntimeError> {
    match format {
        OutputFormat::Table => Ok(render_table(report)),
        OutputFormat::Json => render_json(report),
    }
}

/// One line of the table: a single resource of a single user.
#[derive(Tabled)]
struct Row {
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Total Calls")]
    total_calls: u64,
    #[tabled(rename = "Calls/sec")]
    calls_per_sec: String,
    #[tabled(rename = "4xx Errors")]
    errors_4xx: u64,
    #[tabled(rename = "5xx Errors")]
    errors_5xx: u64,
    #[tabled(rename = "Other Errors")]
    errors_other: u64,
    #[tabled(rename = "Success Rate")]
    success_rate: String,
}

impl Row {
    fn new(username: &str, stats: &CallStats) -> Self {
        Self {
            username: username.to_string(),
            resource: stats.resource.clone(),
            total_calls: stats.total_calls,
            calls_per_sec: format!("{:.2}", stats.calls_per_sec),
            errors_4xx: stats.errors_4xx,
            errors_5xx: stats.errors_5xx,
            errors_other: stats.errors_other,
            success_rate: match stats.success_rate() {
                Some(rate) => format!("{:.2}%", rate * 100.),
                None => "n/a".to_string(),
            },
        }
    }
}

/// One row per (user, resource), users in name order and resources in catalog order.
pub fn render_table(report: &RunReport) -> String {
    let rows = report
        .stats
        .iter()
        .flat_map(|(username, stats)| stats.iter().map(move |s| Row::new(username, s)));

    let mut out = Table::new(rows)
        .with(Style::blank())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    out.push('\n');

    if !report.failures.is_empty() {
        out.push_str("\nFailed users:\n");
        for (username, reason) in &report.failures {
            out.push_str(&format!("  {username}: {reason}\n"));
        }
    }

    out
}

#[derive(Serialize)]
struct JsonReport<'a> {
    users: BTreeMap<&'a str, Vec<JsonStats<'a>>>,
    failures: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
struct JsonStats<'a> {
    #[serde(flatten)]
    stats: &'a CallStats,
    success_rate: Option<f64>,
}

pub fn render_json(report: &RunReport) -> Result<String, RuntimeError> {
    let users = report
        .stats
        .iter()
        .map(|(username, stats)| {
            let stats = stats
                .iter()
                .map(|stats| JsonStats {
                    stats,
                    success_rate: stats.success_rate(),
                })
                .collect();
            (username.as_str(), stats)
        })
        .collect();

    Ok(serde_json::to_string_pretty(&JsonReport {
        users,
        failures: &report.failures,
    })?)
}
