//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - sets up logging
//! - parses CLI arguments into run configs
//! - runs the index refresh or the program recompute
//! - prints summaries and writes the optional JSON report

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::bulletin::{HttpBulletinSource, SpreadsheetDecoder, resolve_base_url};
use crate::cli::{Command, ComputeArgs, DataArgs, UpdateArgs};
use crate::domain::{BulletinLayout, ComputeConfig, DataLayout, UpdateConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `rwages` binary.
pub fn run() -> Result<(), AppError> {
    init_logging();
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::UpdateIndex(args) => handle_update(args),
        Command::Compute(args) => handle_compute(args),
    }
}

/// Logs go to stderr so stdout carries only the run summary.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_update(args: UpdateArgs) -> Result<(), AppError> {
    let config = update_config_from_args(&args);
    let source = HttpBulletinSource::new(config.base_url.clone());
    let decoder = SpreadsheetDecoder::new(config.bulletin.clone());

    let refresh = pipeline::run_index_update(&config, &source, &decoder)?;
    println!("{}", crate::report::format_update_summary(&refresh));
    Ok(())
}

fn handle_compute(args: ComputeArgs) -> Result<(), AppError> {
    let config = compute_config_from_args(&args);
    let report = pipeline::run_batch(&config)?;

    println!("{}", crate::report::format_batch_summary(&report));

    if let Some(path) = &config.report {
        crate::io::write_report_json(path, &report)?;
    }

    if !report.outcomes.is_empty() && report.succeeded() == 0 {
        return Err(AppError::new(
            2,
            format!("all {} programs failed", report.failed()),
        ));
    }
    Ok(())
}

fn layout_from_args(args: &DataArgs) -> DataLayout {
    let mut layout = DataLayout::in_dir(&args.data_dir, &args.cursor);
    if let Some(path) = &args.historical {
        layout.historical_path = path.clone();
    }
    if let Some(path) = &args.index {
        layout.index_path = path.clone();
    }
    layout
}

pub fn update_config_from_args(args: &UpdateArgs) -> UpdateConfig {
    UpdateConfig {
        layout: layout_from_args(&args.data),
        bulletin: BulletinLayout::default(),
        base_url: resolve_base_url(args.base_url.as_deref()),
        programs: args.data.programs.clone(),
    }
}

pub fn compute_config_from_args(args: &ComputeArgs) -> ComputeConfig {
    ComputeConfig {
        layout: layout_from_args(&args.data),
        programs: args.data.programs.clone(),
        pivot: args.pivot,
        report: args.report.clone(),
    }
}
