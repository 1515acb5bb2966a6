//! Real-wage arithmetic.

pub mod calculator;

pub use calculator::{compute, join};
