//! CPI index series reconciliation.

pub mod builder;

pub use builder::{build_index_series, extrapolate_to, rebase, splice};
