//! `mos-screen` library crate.
//!
//! Screening multiple linear regression for developing MOS equations from
//! conformed station predictor/predictand archives.
//!
//! The binary (`mos-screen`) is a thin wrapper around this library so that:
//!
//! - the engine is testable without spawning processes
//! - ingest, screening and reporting stay easy to navigate separately

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod report;
pub mod screening;
