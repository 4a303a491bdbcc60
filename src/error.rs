//! Error types.
//!
//! Two layers:
//!
//! - [`EngineError`]: the typed taxonomy raised by the regression engine. Some
//!   variants are fatal to a whole run (configuration, shape), others are recorded
//!   per station group and the run carries on.
//! - [`AppError`]: what the binary reports. It carries a process exit code and a
//!   human-readable message.

use thiserror::Error;

/// Exit code for invalid configuration or unreadable inputs.
pub const EXIT_CONFIG: u8 = 2;
/// Exit code for inputs that are not aligned on the station/date axes.
pub const EXIT_SHAPE: u8 = 3;
/// Exit code for numerical failures.
pub const EXIT_NUMERIC: u8 = 4;

/// Failures raised by the screening regression engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The group has too few complete cases to estimate any covariance.
    #[error("group {group}: insufficient sample ({sample_count} complete cases)")]
    InsufficientSample { group: usize, sample_count: usize },

    /// The elimination sweep hit a zero or unusable pivot.
    #[error("group {group}: degenerate pivot {pivot:e} while entering predictor '{predictor}' at step {step}")]
    DegeneratePivot {
        group: usize,
        step: usize,
        predictor: String,
        pivot: f64,
    },

    /// Invalid or missing regression parameters.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Predictor/predictand arrays are not aligned on the station or date axis.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(EXIT_CONFIG, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let exit_code = match err {
            EngineError::Configuration(_) => EXIT_CONFIG,
            EngineError::ShapeMismatch(_) => EXIT_SHAPE,
            EngineError::InsufficientSample { .. } | EngineError::DegeneratePivot { .. } => {
                EXIT_NUMERIC
            }
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
