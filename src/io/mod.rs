//! Input/output helpers.
//!
//! - conformed CSV ingest (`ingest`)
//! - station group lists (`groups`)
//! - regression parameter files (`params`)
//! - equation exports (JSON/CSV) (`export`)

pub mod export;
pub mod groups;
pub mod ingest;
pub mod params;

pub use export::*;
pub use groups::*;
pub use ingest::*;
pub use params::*;
