//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - CSV exports with atomic replacement (`export`)
//! - JSON run report (`report`)

pub mod export;
pub mod ingest;
pub mod report;

pub use export::*;
pub use ingest::*;
pub use report::*;
