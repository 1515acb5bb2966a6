//! Derived wage series.
//!
//! For a wage series `n[t]`, index series `i[t]`, first month `t0`, last month
//! `tl` and pivot `p`:
//!
//! - `adjusted[t]   = n[t]` for `t < p`, else `n[p] * i[t] / i[p]`
//! - `real_index[t] = (n[t] / n[t0]) / i[t]`
//! - `real_level[t] = n[tl] * real_index[t] / real_index[tl]`
//!
//! Ratios are formed before multiplying so anchor months reproduce their
//! nominal value exactly (`real_level[tl] == n[tl]`, `adjusted[p] == n[p]`).

use chrono::NaiveDate;

use crate::domain::{DerivedRecord, DerivedWageSeries, IndexSeries, MergedRecord, WageSeries};
use crate::error::IndexError;

/// Left join of wages onto the index by month.
pub fn join(wages: &WageSeries, index: &IndexSeries) -> Vec<MergedRecord> {
    wages
        .points()
        .iter()
        .map(|p| MergedRecord {
            date: p.date,
            nominal: p.nominal,
            index: index.get(p.date),
        })
        .collect()
}

/// An anchor month with both values resolved.
#[derive(Debug, Clone, Copy)]
struct Anchor {
    nominal: f64,
    index: f64,
}

fn resolve_anchor(
    merged: &[MergedRecord],
    date: NaiveDate,
    anchor: &'static str,
) -> Result<Anchor, IndexError> {
    let unresolved = |reason: &str| IndexError::UnresolvedIndex {
        anchor,
        date,
        reason: reason.to_string(),
    };

    let record = merged
        .iter()
        .find(|r| r.date == date)
        .ok_or_else(|| unresolved("no wage observation for this month"))?;
    let index = record.index.ok_or_else(|| unresolved("no index value for this month"))?;
    if !(record.nominal.is_finite() && record.nominal > 0.0) {
        return Err(unresolved("nominal wage must be > 0"));
    }
    if !(index.is_finite() && index > 0.0) {
        return Err(unresolved("index value must be > 0"));
    }

    Ok(Anchor {
        nominal: record.nominal,
        index,
    })
}

/// Compute adjusted salary, real-wage index and real-wage level for one program.
pub fn compute(
    wages: &WageSeries,
    index: &IndexSeries,
    pivot: NaiveDate,
) -> Result<DerivedWageSeries, IndexError> {
    let merged = join(wages, index);

    let t0 = resolve_anchor(&merged, wages.earliest().date, "first")?;
    let tp = resolve_anchor(&merged, pivot, "pivot")?;
    let tl = resolve_anchor(&merged, wages.latest().date, "last")?;

    let real_index = |nominal: f64, idx: f64| (nominal / t0.nominal) / idx;
    let real_index_last = real_index(tl.nominal, tl.index);

    let records = merged
        .iter()
        .map(|r| {
            let adjusted = if r.date < pivot {
                Some(r.nominal)
            } else {
                r.index.map(|idx| tp.nominal * (idx / tp.index))
            };
            let ri = r.index.map(|idx| real_index(r.nominal, idx));
            DerivedRecord {
                date: r.date,
                nominal: r.nominal,
                index: r.index,
                adjusted,
                real_index: ri,
                real_level: ri.map(|ri| tl.nominal * (ri / real_index_last)),
            }
        })
        .collect();

    Ok(DerivedWageSeries {
        program: wages.program.clone(),
        pivot,
        records,
    })
}
