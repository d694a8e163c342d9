//! CLI subcommand handlers.

use crate::render;
use crate::{Commands, ConfigAction, CorrelateArgs, ExportArgs, FormatChoice, SourceArgs};
use anyhow::Context;
use chrono::Utc;
use sightline_core::{
    CorrelationEngine, CorrelationRequest, CorrelationResult, EngineConfig, ExportFormat,
    load_config, sources_from_config,
};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match command {
        Commands::Correlate(args) => handle_correlate(args, workspace, config_file).await,
        Commands::Export(args) => handle_export(args, workspace, config_file).await,
        Commands::Config { action } => handle_config(action, workspace, config_file),
    }
}

async fn handle_correlate(
    args: CorrelateArgs,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    let config = resolve_config(workspace, config_file, &args.sources)?;
    let page_size = config.page_size;
    let result = run_engine(config, &args.sources).await;

    let view = result.view(args.filter, args.page, page_size);
    if args.json {
        println!("{}", render::view_json(&result, &view)?);
    } else {
        print!("{}", render::view_table(&result, &view));
    }
    Ok(())
}

async fn handle_export(
    args: ExportArgs,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    let config = resolve_config(workspace, config_file, &args.sources)?;
    let top_assets = config.top_assets;
    let result = run_engine(config, &args.sources).await;

    std::fs::create_dir_all(&args.out_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            args.out_dir.display()
        )
    })?;

    let now = Utc::now();
    for format in export_formats(args.format) {
        let payload = result.export(*format, args.filter, top_assets, now)?;
        let path = payload.write_to_dir(&args.out_dir)?;
        info!(
            path = %path.display(),
            content_type = format.content_type(),
            bytes = payload.body.len(),
            "Export written"
        );
        println!("Wrote {} ({})", path.display(), format.content_type());
    }
    Ok(())
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".sightline");
            std::fs::create_dir_all(&config_dir)?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let toml_str = toml::to_string_pretty(&EngineConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let engine = CorrelationEngine::from_workspace(workspace, config_file, None)
                .context("Failed to load config")?;
            let toml_str = toml::to_string_pretty(engine.config())?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}

/// Layered config with source locations from the command line applied on top.
fn resolve_config(
    workspace: &Path,
    config_file: Option<&Path>,
    sources: &SourceArgs,
) -> anyhow::Result<EngineConfig> {
    let mut config = load_config(Some(workspace), config_file, None)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    apply_source_args(&mut config, sources);
    Ok(config)
}

fn apply_source_args(config: &mut EngineConfig, args: &SourceArgs) {
    let targets = [
        (&mut config.sources.ioc_alerts, &args.ioc_alerts),
        (&mut config.sources.custom_alerts, &args.custom_alerts),
        (&mut config.sources.assets, &args.assets),
        (&mut config.sources.incidents, &args.incidents),
    ];
    for (slot, value) in targets {
        if let Some(location) = value {
            *slot = Some(location.clone());
        }
    }
}

async fn run_engine(config: EngineConfig, args: &SourceArgs) -> CorrelationResult {
    let sources = sources_from_config(&config.sources);
    if sources.is_empty() {
        warn!("No telemetry sources configured; results will be synthetic");
    }

    let mut request = CorrelationRequest::new(args.category.clone());
    if let Some(expected) = args.expected {
        request = request.with_expected_count(expected);
    }

    // Ctrl+C cancels in-flight fetches; whatever arrived is still correlated.
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling source fetches");
            trigger.cancel();
        }
    });

    let engine = CorrelationEngine::new(config);
    let result = engine.run(&sources, &request, &cancel).await;
    watcher.abort();
    result
}

fn export_formats(choice: FormatChoice) -> &'static [ExportFormat] {
    match choice {
        FormatChoice::Csv => &[ExportFormat::Csv],
        FormatChoice::Json => &[ExportFormat::Json],
        FormatChoice::Both => &[ExportFormat::Csv, ExportFormat::Json],
    }
}
