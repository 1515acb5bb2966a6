//! CSV exports (reconciled index + per-program outputs).
//!
//! Column names are the ones already used by the `datos/` directory and the
//! charting scripts that read it: `fecha,indice`, `fecha,salario_real` and
//! `fecha,nominal,ajustado`.
//!
//! Every write goes through `write_atomic`: the new content is written to a
//! temporary file in the destination directory and renamed over the target, so
//! an interrupted run leaves the previously committed file intact.

use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use tempfile::NamedTempFile;

use crate::domain::{DerivedWageSeries, IndexSeries};
use crate::error::IndexError;

/// Replace `path` with `bytes` via write-new-then-rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), IndexError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| IndexError::io(path, e))?;
    tmp.write_all(bytes).map_err(|e| IndexError::io(path, e))?;
    tmp.as_file().sync_all().map_err(|e| IndexError::io(path, e))?;
    tmp.persist(path).map_err(|e| IndexError::io(path, e.error))?;
    Ok(())
}

/// Write the reconciled `fecha,indice` series.
pub fn write_index_csv(path: &Path, series: &IndexSeries) -> Result<(), IndexError> {
    let rows = series
        .points()
        .map(|p| vec![fmt_date(p.date), fmt_num(p.value)]);
    write_csv(path, &["fecha", "indice"], rows)
}

/// Write `fecha,salario_real` (the real-wage level) for the full history of one program.
pub fn write_real_level_csv(path: &Path, derived: &DerivedWageSeries) -> Result<(), IndexError> {
    let rows = derived
        .records
        .iter()
        .map(|r| vec![fmt_date(r.date), fmt_opt(r.real_level)]);
    write_csv(path, &["fecha", "salario_real"], rows)
}

/// Write `fecha,nominal,ajustado` restricted to months at or after the pivot.
pub fn write_adjusted_csv(path: &Path, derived: &DerivedWageSeries) -> Result<(), IndexError> {
    let rows = derived
        .since_pivot()
        .map(|r| vec![fmt_date(r.date), fmt_num(r.nominal), fmt_opt(r.adjusted)]);
    write_csv(path, &["fecha", "nominal", "ajustado"], rows)
}

fn write_csv<I>(path: &Path, header: &[&str], rows: I) -> Result<(), IndexError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let csv_err = |e: csv::Error| IndexError::invalid_input(path, format!("failed to encode CSV: {e}"));

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header).map_err(csv_err)?;
    for row in rows {
        writer.write_record(&row).map_err(csv_err)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| IndexError::invalid_input(path, format!("failed to flush CSV: {e}")))?;

    write_atomic(path, &bytes)
}

fn fmt_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

// Shortest round-trip representation, so rewriting unchanged data is byte-stable.
fn fmt_num(v: f64) -> String {
    v.to_string()
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(fmt_num).unwrap_or_default()
}
