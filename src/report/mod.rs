//! Reporting utilities: run summaries and per-program status lines.

pub mod format;

pub use format::{format_batch_summary, format_program_line, format_update_summary};
