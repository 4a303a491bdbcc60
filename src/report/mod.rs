//! Reporting: run summaries, equation listings and predictor usage.

pub mod format;

pub use format::*;
