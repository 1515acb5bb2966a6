//! Shared domain types.
//!
//! Every date in this crate is a calendar month, represented as the
//! `NaiveDate` of its first day. Series are keyed by that date.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{Datelike, Months, NaiveDate};

/// Truncate a date to the first day of its month.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of the month following `month`.
pub fn next_month(month: NaiveDate) -> NaiveDate {
    month_start(month) + Months::new(1)
}

/// One month's CPI index value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// A CPI index series ordered by month.
///
/// The map keeps one value per month. Points appended by extrapolation are
/// tracked through `synthetic_from` so callers can report them; they are never
/// distinguished in the persisted file.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSeries {
    points: BTreeMap<NaiveDate, f64>,
    synthetic_from: Option<NaiveDate>,
}

impl IndexSeries {
    /// Build a series from points that are already ascending, one per month.
    pub fn new(points: Vec<IndexPoint>) -> Result<Self, String> {
        if points.is_empty() {
            return Err("index series is empty".to_string());
        }

        let mut map = BTreeMap::new();
        let mut prev: Option<NaiveDate> = None;
        for p in points {
            if p.date != month_start(p.date) {
                return Err(format!("index date {} is not the first of a month", p.date));
            }
            if !(p.value.is_finite() && p.value > 0.0) {
                return Err(format!("index value for {} must be finite and > 0, got {}", p.date, p.value));
            }
            if let Some(prev) = prev {
                if p.date <= prev {
                    return Err(format!("index dates must be strictly increasing ({} after {prev})", p.date));
                }
            }
            prev = Some(p.date);
            map.insert(p.date, p.value);
        }

        Ok(Self {
            points: map,
            synthetic_from: None,
        })
    }

    pub(crate) fn from_map(points: BTreeMap<NaiveDate, f64>) -> Self {
        Self {
            points,
            synthetic_from: None,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, month: NaiveDate) -> Option<f64> {
        self.points.get(&month).copied()
    }

    pub fn first(&self) -> Option<IndexPoint> {
        self.points
            .iter()
            .next()
            .map(|(&date, &value)| IndexPoint { date, value })
    }

    pub fn last(&self) -> Option<IndexPoint> {
        self.points
            .iter()
            .next_back()
            .map(|(&date, &value)| IndexPoint { date, value })
    }

    /// The two most recent points, oldest first.
    pub fn last_two(&self) -> Option<(IndexPoint, IndexPoint)> {
        let mut tail = self.points.iter().rev();
        let (&d1, &v1) = tail.next()?;
        let (&d0, &v0) = tail.next()?;
        Some((IndexPoint { date: d0, value: v0 }, IndexPoint { date: d1, value: v1 }))
    }

    /// The as-of month (last point's date).
    pub fn as_of(&self) -> Option<NaiveDate> {
        self.points.keys().next_back().copied()
    }

    /// First month that was appended by extrapolation, if any.
    pub fn synthetic_from(&self) -> Option<NaiveDate> {
        self.synthetic_from
    }

    /// Number of extrapolated months at the tail.
    pub fn synthetic_len(&self) -> usize {
        match self.synthetic_from {
            Some(from) => self.points.range(from..).count(),
            None => 0,
        }
    }

    pub fn points(&self) -> impl Iterator<Item = IndexPoint> + '_ {
        self.points.iter().map(|(&date, &value)| IndexPoint { date, value })
    }

    /// First pair of consecutive points that are more than one month apart.
    pub fn first_gap(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut iter = self.points.keys();
        let mut prev = *iter.next()?;
        for &date in iter {
            if date != next_month(prev) {
                return Some((prev, date));
            }
            prev = date;
        }
        None
    }

    pub(crate) fn push_synthetic(&mut self, date: NaiveDate, value: f64) {
        if self.synthetic_from.is_none() {
            self.synthetic_from = Some(date);
        }
        self.points.insert(date, value);
    }
}

/// One month's nominal salary for a program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WagePoint {
    pub date: NaiveDate,
    pub nominal: f64,
}

/// Nominal wage history of a single compensation program.
#[derive(Debug, Clone, PartialEq)]
pub struct WageSeries {
    pub program: String,
    points: Vec<WagePoint>,
}

impl WageSeries {
    /// Build a series; dates must be ascending month starts without duplicates.
    pub fn new(program: impl Into<String>, points: Vec<WagePoint>) -> Result<Self, String> {
        if points.is_empty() {
            return Err("wage series is empty".to_string());
        }
        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(format!(
                    "wage dates must be ascending without duplicates ({} after {})",
                    pair[1].date, pair[0].date
                ));
            }
        }
        if let Some(p) = points.iter().find(|p| !p.nominal.is_finite()) {
            return Err(format!("non-finite nominal value at {}", p.date));
        }
        Ok(Self {
            program: program.into(),
            points,
        })
    }

    pub fn points(&self) -> &[WagePoint] {
        &self.points
    }

    /// Oldest observation. `new` rejects empty input, so there always is one.
    pub fn earliest(&self) -> WagePoint {
        self.points[0]
    }

    /// Most recent observation.
    pub fn latest(&self) -> WagePoint {
        self.points[self.points.len() - 1]
    }
}

/// Result of left-joining a wage series against the index series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergedRecord {
    pub date: NaiveDate,
    pub nominal: f64,
    pub index: Option<f64>,
}

/// One month of derived wage figures.
///
/// Fields that need an index value are `None` for months the join could not resolve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedRecord {
    pub date: NaiveDate,
    pub nominal: f64,
    pub index: Option<f64>,
    /// Nominal before the pivot; inflation-tracked pivot salary from the pivot on.
    pub adjusted: Option<f64>,
    /// Deflated wage index with the first month at `1 / index[t0]`.
    pub real_index: Option<f64>,
    /// Real wage in currency units of the last observed month.
    pub real_level: Option<f64>,
}

/// Calculator output for one program.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedWageSeries {
    pub program: String,
    pub pivot: NaiveDate,
    pub records: Vec<DerivedRecord>,
}

impl DerivedWageSeries {
    /// Records at or after the pivot month.
    pub fn since_pivot(&self) -> impl Iterator<Item = &DerivedRecord> {
        let pivot = self.pivot;
        self.records.iter().filter(move |r| r.date >= pivot)
    }
}

/// Where a bulletin's national index row lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulletinLayout {
    pub sheet: String,
    /// Zero-based row holding the national-coverage index.
    pub row: u32,
    /// Zero-based column of the first published month.
    pub first_col: u32,
    /// Month assigned to the first extracted value.
    pub first_month: NaiveDate,
}

impl Default for BulletinLayout {
    fn default() -> Self {
        Self {
            sheet: "Índices IPC Cobertura Nacional".to_string(),
            row: 9,
            first_col: 2,
            first_month: NaiveDate::from_ymd_opt(2017, 1, 1).unwrap_or_default(),
        }
    }
}

/// File locations used by both batch entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    pub data_dir: PathBuf,
    pub cursor_path: PathBuf,
    pub historical_path: PathBuf,
    pub index_path: PathBuf,
}

impl DataLayout {
    /// Conventional layout rooted at `data_dir`.
    pub fn in_dir(data_dir: impl Into<PathBuf>, cursor_path: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            historical_path: data_dir.join("ipc_crudo.csv"),
            index_path: data_dir.join("ipc_nuevo.csv"),
            cursor_path: cursor_path.into(),
            data_dir,
        }
    }

    pub fn bulletin_path(&self, filename: &str) -> PathBuf {
        self.data_dir.join(filename)
    }

    pub fn raw_wage_path(&self, program: &str) -> PathBuf {
        self.data_dir.join(format!("crudo_{program}.csv"))
    }

    pub fn real_output_path(&self, program: &str) -> PathBuf {
        self.data_dir.join(format!("{program}.csv"))
    }

    pub fn adjusted_output_path(&self, program: &str) -> PathBuf {
        self.data_dir.join(format!("{program}_ajustado.csv"))
    }
}

/// Configuration of an index-refresh run.
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    pub layout: DataLayout,
    pub bulletin: BulletinLayout,
    pub base_url: String,
    /// Programs whose raw wage files define how far the index must reach.
    pub programs: Vec<String>,
}

/// Configuration of a program recompute run.
#[derive(Debug, Clone)]
pub struct ComputeConfig {
    pub layout: DataLayout,
    pub programs: Vec<String>,
    pub pivot: NaiveDate,
    pub report: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn next_month_rolls_over_year() {
        assert_eq!(next_month(ym(2024, 12)), ym(2025, 1));
        assert_eq!(next_month(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()), ym(2024, 2));
    }

    #[test]
    fn index_series_rejects_unordered_and_non_positive() {
        let unordered = vec![
            IndexPoint { date: ym(2024, 2), value: 1.0 },
            IndexPoint { date: ym(2024, 1), value: 1.0 },
        ];
        assert!(IndexSeries::new(unordered).is_err());

        let zero = vec![IndexPoint { date: ym(2024, 1), value: 0.0 }];
        assert!(IndexSeries::new(zero).is_err());

        assert!(IndexSeries::new(Vec::new()).is_err());
    }

    #[test]
    fn first_gap_reports_missing_month() {
        let series = IndexSeries::new(vec![
            IndexPoint { date: ym(2024, 1), value: 1.0 },
            IndexPoint { date: ym(2024, 2), value: 1.1 },
            IndexPoint { date: ym(2024, 4), value: 1.3 },
        ])
        .unwrap();
        assert_eq!(series.first_gap(), Some((ym(2024, 2), ym(2024, 4))));
    }

    #[test]
    fn wage_series_rejects_duplicate_months() {
        let points = vec![
            WagePoint { date: ym(2024, 1), nominal: 10.0 },
            WagePoint { date: ym(2024, 1), nominal: 11.0 },
        ];
        assert!(WageSeries::new("cic", points).is_err());
    }

    #[test]
    fn wage_series_is_never_empty() {
        assert!(WageSeries::new("cic", Vec::new()).is_err());

        let series = WageSeries::new(
            "cic",
            vec![
                WagePoint { date: ym(2024, 1), nominal: 10.0 },
                WagePoint { date: ym(2024, 3), nominal: 12.0 },
            ],
        )
        .unwrap();
        assert_eq!(series.earliest().date, ym(2024, 1));
        assert_eq!(series.latest(), WagePoint { date: ym(2024, 3), nominal: 12.0 });
    }

    #[test]
    fn derived_series_filters_from_pivot() {
        let record = |date| DerivedRecord {
            date,
            nominal: 1.0,
            index: Some(1.0),
            adjusted: Some(1.0),
            real_index: Some(1.0),
            real_level: Some(1.0),
        };
        let derived = DerivedWageSeries {
            program: "cic".to_string(),
            pivot: ym(2023, 11),
            records: vec![record(ym(2023, 10)), record(ym(2023, 11)), record(ym(2023, 12))],
        };
        let dates: Vec<_> = derived.since_pivot().map(|r| r.date).collect();
        assert_eq!(dates, vec![ym(2023, 11), ym(2023, 12)]);
    }
}
