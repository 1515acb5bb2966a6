//! Continuous CPI series construction.
//!
//! Pipeline: historical baseline + rebased bulletin values -> gap check ->
//! geometric extrapolation up to the month the wage data needs.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::info;

use crate::domain::{IndexPoint, IndexSeries, next_month};
use crate::error::IndexError;

/// Bulletins are published on a base where the reference period equals 100.
const BULLETIN_BASE: f64 = 100.0;

/// Express bulletin values in the units of a series whose value at the
/// bulletin's reference period is `anchor`.
pub fn rebase(bulletin: &[IndexPoint], anchor: f64) -> Vec<IndexPoint> {
    bulletin
        .iter()
        .map(|p| IndexPoint {
            date: p.date,
            value: p.value * anchor / BULLETIN_BASE,
        })
        .collect()
}

/// Append rebased bulletin values to the historical series.
///
/// The anchor is the last historical value. Where months overlap, bulletin
/// values replace historical ones. The result must have no missing months.
pub fn splice(historical: &IndexSeries, bulletin: &[IndexPoint]) -> Result<IndexSeries, IndexError> {
    let anchor = historical
        .last()
        .ok_or(IndexError::InsufficientHistory { found: 0 })?
        .value;

    let mut points: BTreeMap<NaiveDate, f64> = historical.points().map(|p| (p.date, p.value)).collect();
    for p in rebase(bulletin, anchor) {
        points.insert(p.date, p.value);
    }

    let series = IndexSeries::from_map(points);
    if let Some((after, before)) = series.first_gap() {
        return Err(IndexError::NonContiguous { after, before });
    }
    Ok(series)
}

/// Extend `series` one month at a time until its last month reaches `target`,
/// repeating the latest month-over-month ratio. Returns the number of months added.
pub fn extrapolate_to(series: &mut IndexSeries, target: NaiveDate) -> Result<usize, IndexError> {
    let mut added = 0;
    loop {
        let (prev, last) = match series.last_two() {
            Some(pair) => pair,
            None => match series.last() {
                Some(last) if last.date >= target => return Ok(added),
                _ => return Err(IndexError::InsufficientHistory { found: series.len() }),
            },
        };
        if last.date >= target {
            return Ok(added);
        }

        let date = next_month(last.date);
        let value = last.value * (last.value / prev.value);
        info!(month = %date.format("%Y-%m"), value, "Missing index value, extrapolating");
        series.push_synthetic(date, value);
        added += 1;
    }
}

/// Full build: splice, then extrapolate to `target`.
pub fn build_index_series(
    historical: &IndexSeries,
    bulletin: &[IndexPoint],
    target: NaiveDate,
) -> Result<IndexSeries, IndexError> {
    let mut series = splice(historical, bulletin)?;
    extrapolate_to(&mut series, target)?;
    Ok(series)
}
