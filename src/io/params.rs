//! Regression parameter files (JSON).
//!
//! Every field is optional; missing fields take their defaults.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::RegressionParams;
use crate::error::AppError;

/// Load parameters from a JSON file.
pub fn load_params(path: &Path) -> Result<RegressionParams, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::config(format!("Failed to open parameter file '{}': {e}", path.display()))
    })?;
    serde_json::from_reader(file)
        .map_err(|e| AppError::config(format!("Invalid parameter file '{}': {e}", path.display())))
}

/// Write parameters as pretty JSON.
pub fn write_params<W: Write>(out: W, params: &RegressionParams) -> Result<(), AppError> {
    serde_json::to_writer_pretty(out, params)
        .map_err(|e| AppError::config(format!("Failed to write parameters: {e}")))
}
