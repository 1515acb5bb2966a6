//! Command-line parsing for the real-wage batch tool.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! index and wage code. Arguments are turned into `UpdateConfig` /
//! `ComputeConfig` in `app` before any work happens.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "rwages", version, about = "CPI-deflated wage series from nominal salaries and INDEC bulletins")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the next CPI bulletin if published and rebuild the reconciled index file.
    UpdateIndex(UpdateArgs),
    /// Recompute every program's real-wage outputs from the reconciled index file.
    Compute(ComputeArgs),
}

/// File locations shared by both subcommands.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// Directory holding raw wages, index files, bulletins and outputs.
    #[arg(long, default_value = "datos")]
    pub data_dir: PathBuf,

    /// Cursor file naming the latest known-good bulletin.
    #[arg(long, default_value = "version_IPC.txt")]
    pub cursor: PathBuf,

    /// Historical index file (defaults to `<data-dir>/ipc_crudo.csv`).
    #[arg(long)]
    pub historical: Option<PathBuf>,

    /// Reconciled index file (defaults to `<data-dir>/ipc_nuevo.csv`).
    #[arg(long)]
    pub index: Option<PathBuf>,

    /// Compensation programs to process.
    #[arg(long, value_delimiter = ',', default_value = "cic,conicet,foncyt,profasis")]
    pub programs: Vec<String>,
}

/// Options for `update-index`.
#[derive(Debug, Args, Clone)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Base URL bulletins are downloaded from (overrides `RWAGES_BULLETIN_BASE_URL`).
    #[arg(long)]
    pub base_url: Option<String>,
}

/// Options for `compute`.
#[derive(Debug, Args, Clone)]
pub struct ComputeArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Month from which `adjusted` tracks inflation instead of the paid amount.
    #[arg(long, default_value = "2023-11-01", value_parser = parse_month)]
    pub pivot: NaiveDate,

    /// Write per-program outcomes to a JSON file.
    #[arg(long, value_name = "JSON")]
    pub report: Option<PathBuf>,
}

/// Accept `YYYY-MM` or `YYYY-MM-DD`; the day is dropped.
fn parse_month(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d"))
        .map(crate::domain::month_start)
        .map_err(|_| format!("invalid month '{s}', expected YYYY-MM or YYYY-MM-DD"))
}
