//! CLI entrypoint for quorum-forge
//!
//! This is the main binary that wires together all layers: configuration,
//! logging, the synthetic demo pipeline and the reliability benchmark.

mod bench;
mod demo;

use anyhow::{Result, anyhow, bail};
use clap::Parser;
use demo::AppState;
use forge_application::{EventSink, NoEvents, Tee};
use forge_domain::{
    ConsensusStrategy, OutputFormat, PipelineEvent, StepEvent, StrategyOverrides,
};
use forge_infrastructure::{ConfigLoader, FileConfig, JsonlEventLogger};
use forge_presentation::{
    Cli, Command, ConsoleFormatter, EventPrinter, ProgressReporter, SimpleProgress,
};
use serde_json::Value;
use std::io::IsTerminal;
use std::path::Path;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const DEFAULT_PROMPT: &str = "Hello World React app";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_tracing(cli.verbose, config.logging.file.as_deref());

    info!("Starting quorum-forge");
    report_config_issues(&config, cli.quiet)?;

    if !config.output.color {
        colored::control::set_override(false);
    }

    let format: OutputFormat = cli
        .output
        .map(Into::into)
        .or(config.output.parse_format().0)
        .unwrap_or_default();

    let events_path = cli
        .events_file
        .clone()
        .or_else(|| config.logging.events_file.clone());
    let event_log = events_path
        .as_ref()
        .and_then(|path| JsonlEventLogger::new(path));
    if let Some(log) = &event_log {
        info!("Writing events to {}", log.path().display());
    }

    let overrides = config.strategy.to_overrides();
    let command = cli.command.clone().unwrap_or(Command::Demo {
        prompt: DEFAULT_PROMPT.to_string(),
    });

    match command {
        Command::Demo { prompt } => {
            run_demo(prompt, &overrides, format, cli.quiet, event_log.as_ref()).await
        }
        Command::Bench { iterations, seed } => {
            if iterations == 0 {
                bail!("--iterations must be at least 1");
            }
            run_bench(seed, iterations, &overrides, format, event_log.as_ref()).await
        }
    }
}

/// Initialize logging based on verbosity level, optionally mirrored to a file
fn init_tracing(verbose: u8, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(level));

    let mut guard = None;
    let file_layer = log_file.and_then(|path| {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path.file_name()?;
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Warning: failed to create log directory {}: {}", dir.display(), e);
            return None;
        }
        let appender = tracing_appender::rolling::never(dir, name);
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        guard = Some(file_guard);
        Some(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(EnvFilter::new(level)),
        )
    });

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}

fn report_config_issues(config: &FileConfig, quiet: bool) -> Result<()> {
    let issues = config.validate();
    for issue in &issues {
        warn!("{}", issue.message);
        if !quiet && !issue.is_error() {
            eprintln!("Warning: {}", issue.message);
        }
    }

    if let Some(error) = issues.iter().find(|issue| issue.is_error()) {
        bail!("Invalid configuration: {}", error.message);
    }
    Ok(())
}

async fn run_demo(
    prompt: String,
    overrides: &StrategyOverrides,
    format: OutputFormat,
    quiet: bool,
    event_log: Option<&JsonlEventLogger>,
) -> Result<()> {
    let strategy = ConsensusStrategy::default().merge(overrides);
    let pipeline = demo::build_pipeline(strategy);
    info!(
        "Demo pipeline: {}",
        pipeline.stage_names().join(" -> ")
    );

    let progress: Box<dyn EventSink<PipelineEvent<AppState>>> = match format {
        OutputFormat::Events => Box::new(EventPrinter),
        _ if quiet => Box::new(NoEvents),
        OutputFormat::Json => Box::new(NoEvents),
        OutputFormat::Summary if std::io::stdout().is_terminal() => {
            Box::new(ProgressReporter::new())
        }
        OutputFormat::Summary => Box::new(SimpleProgress),
    };

    let initial = AppState::new(prompt);
    let state = match event_log {
        Some(log) => {
            pipeline
                .run_with_events(initial, &Tee::new(progress.as_ref(), log))
                .await?
        }
        None => pipeline.run_with_events(initial, progress.as_ref()).await?,
    };

    match format {
        OutputFormat::Summary => println!("{}", ConsoleFormatter::format_summary(&state)),
        OutputFormat::Json => println!("{}", ConsoleFormatter::format_json(&state)),
        OutputFormat::Events => {}
    }

    Ok(())
}

async fn run_bench(
    seed: u32,
    iterations: u32,
    overrides: &StrategyOverrides,
    format: OutputFormat,
    event_log: Option<&JsonlEventLogger>,
) -> Result<()> {
    let observer: Box<dyn EventSink<StepEvent<Value>>> = match format {
        OutputFormat::Events => Box::new(EventPrinter),
        _ => Box::new(NoEvents),
    };

    let report = match event_log {
        Some(log) => {
            bench::run(seed, iterations, overrides, &Tee::new(observer.as_ref(), log)).await?
        }
        None => bench::run(seed, iterations, overrides, observer.as_ref()).await?,
    };

    match format {
        OutputFormat::Summary => {
            println!();
            println!("Forge reliability benchmark (synthetic)");
            println!(
                "Tasks: {} x {} rounds | Failure modes: invalid JSON, missing fields, unrealistic estimates",
                report.tasks, report.iterations
            );
            println!(
                "{}",
                ConsoleFormatter::format_table("Raw model calls", &metric_rows(&report.baseline))
            );
            println!(
                "{}",
                ConsoleFormatter::format_table(
                    "Consensus step with validation",
                    &metric_rows(&report.consensus)
                )
            );
        }
        OutputFormat::Json => println!("{}", ConsoleFormatter::format_json(&report)),
        OutputFormat::Events => {}
    }

    Ok(())
}

fn metric_rows(metrics: &bench::Metrics) -> Vec<(&'static str, String)> {
    vec![
        ("Valid outputs", metrics.valid.to_string()),
        ("Invalid outputs", metrics.invalid.to_string()),
        (
            "Avg invalid detail count",
            format!("{:.2}", metrics.avg_invalid_details()),
        ),
        ("Attempts evaluated", metrics.attempts.to_string()),
        ("Valid %", format!("{:.1}%", metrics.valid_percent())),
        ("Red-flag skips", metrics.red_flags.to_string()),
        ("Failed tasks", metrics.failed.to_string()),
    ]
}
