//! The two batch workflows behind the CLI.
//!
//! - index refresh: cursor -> bulletin protocol -> splice/extrapolate -> `ipc_nuevo.csv`
//! - program recompute: reconciled index + raw wages -> per-program outputs
//!
//! Both take their collaborators as arguments so tests can drive them against
//! a temporary directory without network access.

use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::bulletin::{BulletinCursor, BulletinDecoder, BulletinSource, UpdateOutcome, refresh_bulletin};
use crate::domain::{ComputeConfig, DataLayout, IndexSeries, UpdateConfig};
use crate::error::IndexError;
use crate::index::build_index_series;
use crate::io::{read_index_csv, read_wage_csv, write_adjusted_csv, write_index_csv, write_real_level_csv};
use crate::wages;

/// Everything an index-refresh run produced.
#[derive(Debug, Clone)]
pub struct IndexRefresh {
    pub outcome: UpdateOutcome,
    pub series: IndexSeries,
    /// Month the series had to reach (latest month of wage data).
    pub target: NaiveDate,
    pub output: PathBuf,
}

/// Refresh the reconciled index file from bulletins.
///
/// Any error here is fatal for the run: every program depends on this series.
pub fn run_index_update(
    config: &UpdateConfig,
    source: &dyn BulletinSource,
    decoder: &dyn BulletinDecoder,
) -> Result<IndexRefresh, IndexError> {
    let layout = &config.layout;
    fs::create_dir_all(&layout.data_dir).map_err(|e| IndexError::io(&layout.data_dir, e))?;

    let cursor = BulletinCursor::load(&layout.cursor_path)?;
    let target = latest_wage_month(layout, &config.programs)?;
    let historical = read_index_csv(&layout.historical_path)?;

    let update = refresh_bulletin(cursor, source, decoder, &layout.data_dir)?;
    let series = build_index_series(&historical, &update.points, target)?;
    write_index_csv(&layout.index_path, &series)?;

    info!(
        bulletin = %update.outcome.bulletin(),
        months = series.len(),
        synthetic = series.synthetic_len(),
        output = %layout.index_path.display(),
        "Index series written"
    );

    Ok(IndexRefresh {
        outcome: update.outcome,
        series,
        target,
        output: layout.index_path.clone(),
    })
}

/// Latest month observed across the configured programs' raw wage files.
fn latest_wage_month(layout: &DataLayout, programs: &[String]) -> Result<NaiveDate, IndexError> {
    let mut latest: Option<NaiveDate> = None;
    for program in programs {
        let path = layout.raw_wage_path(program);
        match read_wage_csv(&path, program) {
            Ok(series) => {
                let last = series.latest().date;
                latest = Some(latest.map_or(last, |d| d.max(last)));
            }
            Err(e) => warn!(program = %program, error = %e, "Skipping unreadable wage file"),
        }
    }

    latest.ok_or_else(|| {
        IndexError::invalid_input(
            &layout.data_dir,
            format!("no readable wage file for programs [{}]", programs.join(", ")),
        )
    })
}

/// Per-program success details.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramSummary {
    pub months: usize,
    pub first: NaiveDate,
    pub last: NaiveDate,
    pub last_nominal: f64,
    pub last_adjusted: Option<f64>,
    pub real_output: PathBuf,
    pub adjusted_output: PathBuf,
}

/// Outcome of one program in a batch.
#[derive(Debug)]
pub struct ProgramOutcome {
    pub program: String,
    pub result: Result<ProgramSummary, IndexError>,
}

impl ProgramOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcome of a recompute batch.
#[derive(Debug)]
pub struct BatchReport {
    pub pivot: NaiveDate,
    pub index_as_of: Option<NaiveDate>,
    pub outcomes: Vec<ProgramOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Recompute every program from the reconciled index file.
///
/// Only an unreadable index file aborts the batch; each program's failure is
/// logged and recorded in its `ProgramOutcome`.
pub fn run_batch(config: &ComputeConfig) -> Result<BatchReport, IndexError> {
    let index = read_index_csv(&config.layout.index_path)?;

    let outcomes = config
        .programs
        .iter()
        .map(|program| {
            let result = process_program(&config.layout, program, &index, config.pivot);
            match &result {
                Ok(summary) => info!(program = %program, months = summary.months, "Program processed"),
                Err(e) => error!(program = %program, error = %e, "Program failed"),
            }
            ProgramOutcome {
                program: program.clone(),
                result,
            }
        })
        .collect();

    Ok(BatchReport {
        pivot: config.pivot,
        index_as_of: index.as_of(),
        outcomes,
    })
}

fn process_program(
    layout: &DataLayout,
    program: &str,
    index: &IndexSeries,
    pivot: NaiveDate,
) -> Result<ProgramSummary, IndexError> {
    let wages = read_wage_csv(&layout.raw_wage_path(program), program)?;
    let derived = wages::compute(&wages, index, pivot)?;

    let real_output = layout.real_output_path(program);
    let adjusted_output = layout.adjusted_output_path(program);
    write_real_level_csv(&real_output, &derived)?;
    write_adjusted_csv(&adjusted_output, &derived)?;

    Ok(ProgramSummary {
        months: derived.records.len(),
        first: wages.earliest().date,
        last: wages.latest().date,
        last_nominal: wages.latest().nominal,
        last_adjusted: derived.records.last().and_then(|r| r.adjusted),
        real_output,
        adjusted_output,
    })
}
