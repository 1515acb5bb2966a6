//! `real-wages` library crate.
//!
//! The binary (`rwages`) is a thin wrapper around this library so that:
//!
//! - the index and wage engine is testable without spawning processes
//! - network and spreadsheet access sit behind traits that tests replace
//!
//! Layout:
//!
//! - `bulletin`: CPI bulletin cursor, download, decoding, update protocol
//! - `index`: rebase, splice and extrapolate the reconciled CPI series
//! - `wages`: join wages with the index and derive real-terms columns
//! - `io`: CSV ingest/export and the JSON run report

pub mod app;
pub mod bulletin;
pub mod cli;
pub mod domain;
pub mod error;
pub mod index;
pub mod io;
pub mod report;
pub mod wages;
