//! Configuration errors shared by the noise, terrain and erosion modules.

use thiserror::Error;

/// A configuration value rejected before any generation or simulation work.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Grid size must be at least 1, got {0}")]
    GridSize(usize),
    #[error("Grid data has {actual} samples, expected {expected} for the given size")]
    GridLength { expected: usize, actual: usize },
    #[error("Octave count must be between 1 and 64, got {0}")]
    Octaves(u32),
    #[error("Noise scale must be finite and non-zero, got {0}")]
    Scale(f64),
    #[error("Parameter '{name}' must be {expected}, got {value}")]
    OutOfRange {
        name: &'static str,
        expected: &'static str,
        value: f64,
    },
}

/// Requires `value` to be finite and `>= 0`.
pub(crate) fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            expected: "finite and >= 0",
            value,
        })
    }
}

/// Requires `value` to be finite and `> 0`.
pub(crate) fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            expected: "finite and > 0",
            value,
        })
    }
}

/// Requires `value` to lie in `[0, 1]`.
pub(crate) fn unit_interval(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            expected: "within [0, 1]",
            value,
        })
    }
}
