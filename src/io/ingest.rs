//! CSV ingest for index and wage files.
//!
//! Both readers are strict: a row that does not parse fails the whole file with
//! the offending line number. There is no "skip bad rows" mode.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;

use crate::domain::{IndexPoint, IndexSeries, WagePoint, WageSeries, month_start};
use crate::error::IndexError;

const DATE_COLUMNS: [&str; 2] = ["date", "fecha"];
const INDEX_COLUMNS: [&str; 2] = ["index", "indice"];
const NOMINAL_COLUMNS: [&str; 2] = ["nominal", "salario"];

/// Read a `date,index` file (historical baseline or reconciled series).
pub fn read_index_csv(path: &Path) -> Result<IndexSeries, IndexError> {
    let (headers, records) = read_records(path)?;
    let date_idx = find_column(&headers, &DATE_COLUMNS)
        .ok_or_else(|| IndexError::invalid_input(path, "missing required column: `date`"))?;
    let value_idx = find_column(&headers, &INDEX_COLUMNS)
        .ok_or_else(|| IndexError::invalid_input(path, "missing required column: `index`"))?;

    let mut points = Vec::with_capacity(records.len());
    for (line, record) in records {
        let date = required(&record, date_idx, "date")
            .and_then(parse_date)
            .map_err(|e| IndexError::invalid_input(path, format!("line {line}: {e}")))?;
        let value = required(&record, value_idx, "index")
            .and_then(parse_f64)
            .map_err(|e| IndexError::invalid_input(path, format!("line {line}: {e}")))?;
        points.push(IndexPoint { date, value });
    }

    IndexSeries::new(points).map_err(|e| IndexError::invalid_input(path, e))
}

/// Read a program's raw wage file. Columns other than date/nominal are ignored.
pub fn read_wage_csv(path: &Path, program: &str) -> Result<WageSeries, IndexError> {
    let (headers, records) = read_records(path)?;
    let date_idx = find_column(&headers, &DATE_COLUMNS)
        .ok_or_else(|| IndexError::invalid_input(path, "missing required column: `date`"))?;
    let nominal_idx = find_column(&headers, &NOMINAL_COLUMNS)
        .ok_or_else(|| IndexError::invalid_input(path, "missing required column: `nominal`"))?;

    let mut points = Vec::with_capacity(records.len());
    for (line, record) in records {
        let date = required(&record, date_idx, "date")
            .and_then(parse_date)
            .map_err(|e| IndexError::invalid_input(path, format!("line {line}: {e}")))?;
        let nominal = required(&record, nominal_idx, "nominal")
            .and_then(parse_f64)
            .map_err(|e| IndexError::invalid_input(path, format!("line {line}: {e}")))?;
        points.push(WagePoint { date, nominal });
    }

    WageSeries::new(program, points).map_err(|e| IndexError::invalid_input(path, e))
}

fn read_records(path: &Path) -> Result<(HashMap<String, usize>, Vec<(usize, StringRecord)>), IndexError> {
    let file = File::open(path).map_err(|e| IndexError::io(path, e))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| IndexError::invalid_input(path, format!("failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: header line plus 1-based numbering.
        let line = idx + 2;
        let record =
            result.map_err(|e| IndexError::invalid_input(path, format!("line {line}: CSV parse error: {e}")))?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        records.push((line, record));
    }

    Ok((header_map, records))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn find_column(header_map: &HashMap<String, usize>, aliases: &[&str]) -> Option<usize> {
    aliases.iter().find_map(|name| header_map.get(*name).copied())
}

fn required<'a>(record: &'a StringRecord, idx: usize, name: &'static str) -> Result<&'a str, String> {
    record
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing required value: `{name}`"))
}

/// Parse a month-resolution date, normalized to the first of the month.
fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    // Timestamps such as `2023-11-01 00:00:00` keep only the date part.
    let s = raw.split_whitespace().next().unwrap_or(raw);

    const FMTS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(month_start(d));
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d") {
        return Ok(d);
    }

    Err(format!(
        "invalid date '{raw}'. Expected one of: YYYY-MM-DD, YYYY-MM, DD/MM/YYYY, YYYY/MM/DD."
    ))
}

fn parse_f64(raw: &str) -> Result<f64, String> {
    let v = raw
        .parse::<f64>()
        .map_err(|_| format!("invalid number '{raw}'"))?;
    if v.is_finite() { Ok(v) } else { Err(format!("non-finite number '{raw}'")) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn ym(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn reads_index_file_with_spanish_headers_and_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ipc_crudo.csv");
        fs::write(&path, "\u{feff}fecha,indice\n2016-11-01,98.5\n2016-12-01,100\n").unwrap();

        let series = read_index_csv(&path).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.get(ym(2016, 12)), Some(100.0));
    }

    #[test]
    fn wage_file_ignores_extra_columns_and_normalizes_dates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crudo_cic.csv");
        fs::write(
            &path,
            "date,nominal,usd\n2023-10,100000,120\n2023-11-15,120000,140\n2023-12-01 00:00:00,150000,150\n",
        )
        .unwrap();

        let wages = read_wage_csv(&path, "cic").unwrap();
        let dates: Vec<_> = wages.points().iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![ym(2023, 10), ym(2023, 11), ym(2023, 12)]);
        assert_eq!(wages.program, "cic");
    }

    #[test]
    fn bad_row_reports_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crudo_cic.csv");
        fs::write(&path, "fecha,salario\n2023-10-01,100\n2023-11-01,abc\n").unwrap();

        let err = read_wage_csv(&path, "cic").unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_index_csv(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, IndexError::Io { .. }));
    }

    #[test]
    fn duplicate_month_after_normalization_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crudo_cic.csv");
        fs::write(&path, "date,nominal\n2023-10-01,100\n2023-10-15,110\n").unwrap();
        assert!(matches!(
            read_wage_csv(&path, "cic").unwrap_err(),
            IndexError::InvalidInput { .. }
        ));
    }
}
