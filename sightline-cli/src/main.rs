//! Sightline CLI — correlate security telemetry and export detection reports.

mod commands;
mod render;

use clap::Parser;
use sightline_core::SeverityFilter;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Sightline: correlate IOC alerts, custom alerts, and incidents by affected asset
#[derive(Parser, Debug)]
#[command(name = "sightline", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (looked up for .sightline/config.toml)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path (replaces the workspace config file)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Correlate telemetry and print one page of detections
    Correlate(CorrelateArgs),
    /// Correlate telemetry and write CSV/JSON exports
    Export(ExportArgs),
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Write a default .sightline/config.toml into the workspace
    Init,
    /// Print the effective configuration as TOML
    Show,
}

/// Source locations (file path or http(s) URL); override the configured ones.
#[derive(clap::Args, Debug, Clone, Default)]
struct SourceArgs {
    /// IOC alert list
    #[arg(long, value_name = "LOCATION")]
    ioc_alerts: Option<String>,

    /// Custom alert list
    #[arg(long, value_name = "LOCATION")]
    custom_alerts: Option<String>,

    /// Asset inventory
    #[arg(long, value_name = "LOCATION")]
    assets: Option<String>,

    /// Incident list
    #[arg(long, value_name = "LOCATION")]
    incidents: Option<String>,

    /// Detection category label (used in export file names)
    #[arg(long, default_value = "all")]
    category: String,

    /// Expected detection count; sparse results are topped up to it
    #[arg(long, value_name = "N")]
    expected: Option<usize>,
}

#[derive(clap::Args, Debug)]
struct CorrelateArgs {
    #[command(flatten)]
    sources: SourceArgs,

    /// Severity filter: all, critical, high, medium, low
    #[arg(short, long, default_value = "all")]
    filter: SeverityFilter,

    /// 1-based page number
    #[arg(short, long, default_value_t = 1)]
    page: usize,

    /// Print the page as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    sources: SourceArgs,

    /// Severity filter: all, critical, high, medium, low
    #[arg(short, long, default_value = "all")]
    filter: SeverityFilter,

    /// Output format
    #[arg(long, value_enum, default_value_t = FormatChoice::Both)]
    format: FormatChoice,

    /// Directory the export files are written to
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum FormatChoice {
    Csv,
    Json,
    Both,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    // Human-readable layer for stderr
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    // JSON file layer for structured logging
    let log_dir = directories::ProjectDirs::from("dev", "sightline", "sightline")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "sightline.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace, cli.config.as_deref()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_correlate() {
        let cli = Cli::try_parse_from([
            "sightline",
            "correlate",
            "--ioc-alerts",
            "ioc.json",
            "--filter",
            "HIGH",
            "--page",
            "2",
            "--expected",
            "20",
        ])
        .unwrap();
        match cli.command {
            Commands::Correlate(args) => {
                assert_eq!(args.filter, SeverityFilter::High);
                assert_eq!(args.page, 2);
                assert_eq!(args.sources.ioc_alerts.as_deref(), Some("ioc.json"));
                assert_eq!(args.sources.expected, Some(20));
                assert_eq!(args.sources.category, "all");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_export_defaults() {
        let cli = Cli::try_parse_from(["sightline", "export", "--category", "malware"]).unwrap();
        match cli.command {
            Commands::Export(args) => {
                assert_eq!(args.format, FormatChoice::Both);
                assert_eq!(args.filter, SeverityFilter::All);
                assert_eq!(args.sources.category, "malware");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_unknown_filter() {
        assert!(Cli::try_parse_from(["sightline", "correlate", "--filter", "urgent"]).is_err());
    }
}
