//! CPI bulletin parsing.
//!
//! A bulletin is a spreadsheet whose national-coverage sheet holds one row of
//! base-100 index values, one column per month, starting at a fixed column.
//! The first extracted value belongs to `BulletinLayout::first_month` and each
//! following value to the next consecutive month.

use std::io::Cursor;

use calamine::{Data, Range, Reader, open_workbook_auto_from_rs};
use chrono::NaiveDate;

use crate::domain::{BulletinLayout, IndexPoint, next_month};
use crate::error::IndexError;

/// Turns raw bulletin bytes into dated, still unit-less index points.
pub trait BulletinDecoder {
    fn decode(&self, artifact: &str, bytes: &[u8]) -> Result<Vec<IndexPoint>, IndexError>;
}

/// Decoder for `.xls`/`.xlsx` bulletins.
#[derive(Debug, Clone)]
pub struct SpreadsheetDecoder {
    layout: BulletinLayout,
}

impl SpreadsheetDecoder {
    pub fn new(layout: BulletinLayout) -> Self {
        Self { layout }
    }
}

impl BulletinDecoder for SpreadsheetDecoder {
    fn decode(&self, artifact: &str, bytes: &[u8]) -> Result<Vec<IndexPoint>, IndexError> {
        let parse_err = |reason: String| IndexError::Parse {
            artifact: artifact.to_string(),
            reason,
        };

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| parse_err(format!("not a spreadsheet: {e}")))?;

        if !workbook.sheet_names().iter().any(|name| name == &self.layout.sheet) {
            return Err(parse_err(format!("sheet '{}' not found", self.layout.sheet)));
        }

        let range = workbook
            .worksheet_range(&self.layout.sheet)
            .map_err(|e| parse_err(format!("failed to read sheet '{}': {e}", self.layout.sheet)))?;

        let values = extract_row_values(&range, self.layout.row, self.layout.first_col).map_err(parse_err)?;
        Ok(assign_months(&values, self.layout.first_month))
    }
}

/// Collect the numeric cells of `row` from `first_col` to the sheet's last column.
///
/// Empty and zero cells are skipped. Any other non-numeric content means the
/// layout does not match and the artifact is rejected.
pub fn extract_row_values(range: &Range<Data>, row: u32, first_col: u32) -> Result<Vec<f64>, String> {
    let Some((_, last_col)) = range.end() else {
        return Err("sheet is empty".to_string());
    };

    let mut values = Vec::new();
    for col in first_col..=last_col {
        let Some(cell) = range.get_value((row, col)) else {
            continue;
        };
        let value = match cell {
            Data::Empty => continue,
            Data::Float(f) => *f,
            Data::Int(i) => *i as f64,
            Data::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    continue;
                }
                s.parse::<f64>()
                    .map_err(|_| format!("non-numeric cell '{s}' at row {row}, column {col}"))?
            }
            other => return Err(format!("unexpected cell '{other}' at row {row}, column {col}")),
        };
        if value == 0.0 {
            continue;
        }
        if !(value.is_finite() && value > 0.0) {
            return Err(format!("invalid index value {value} at row {row}, column {col}"));
        }
        values.push(value);
    }

    if values.is_empty() {
        return Err(format!("no index values found in row {row}"));
    }
    Ok(values)
}

/// Date consecutive values starting at `first_month`.
pub fn assign_months(values: &[f64], first_month: NaiveDate) -> Vec<IndexPoint> {
    let mut date = first_month;
    let mut out = Vec::with_capacity(values.len());
    for &value in values {
        out.push(IndexPoint { date, value });
        date = next_month(date);
    }
    out
}
