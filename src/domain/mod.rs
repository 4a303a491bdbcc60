//! Domain types used throughout the engine.
//!
//! This module defines:
//!
//! - the conformed input data (`Variable`, `VariableSet`, `StationGroup`)
//! - regression parameters (`RegressionParams`) and their enums
//! - equation records and run outcomes (`Equation`, `GroupResult`, `RunSummary`)

pub mod types;
pub mod variables;

pub use types::*;
pub use variables::*;
