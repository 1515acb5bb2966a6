//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - month helpers (`month_start`, `next_month`)
//! - CPI and wage series (`IndexSeries`, `WageSeries`)
//! - calculator outputs (`DerivedRecord`, `DerivedWageSeries`)
//! - run configuration (`UpdateConfig`, `ComputeConfig`, `DataLayout`)

pub mod types;

pub use types::*;
