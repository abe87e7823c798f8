//! Error types for plume.
//!
//! The simulation step itself never fails: numerical corruption is healed in
//! place and empty fields are valid. Errors only come from the edges, when a
//! configuration is rejected or an emissions dataset can't be read.

use thiserror::Error;

/// Errors raised when a [`SimConfig`](crate::SimConfig) is rejected or can't be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A knob that must be a positive finite number isn't.
    #[error("`{name}` must be a positive finite number, got {value}")]
    NotPositive {
        /// Name of the offending field.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// The speed multiplier must be finite and non-negative.
    #[error("`speed_multiplier` must be finite and >= 0, got {0}")]
    InvalidSpeedMultiplier(f32),

    /// The atmosphere shell is empty or inverted.
    #[error(
        "atmosphere shell is invalid: earth radius {earth}, min {min}, max {max} (need earth <= min < max)"
    )]
    InvalidShell {
        /// Earth radius.
        earth: f32,
        /// Inner atmosphere radius.
        min: f32,
        /// Outer atmosphere radius.
        max: f32,
    },

    /// Failed to read or write the configuration file.
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON for [`SimConfig`](crate::SimConfig).
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised while loading an emissions dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Failed to read the dataset file.
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    /// The dataset is not a JSON array of companies.
    #[error("invalid dataset format: {0}")]
    Parse(#[from] serde_json::Error),

    /// No company reported a period starting in the requested year.
    #[error("no companies found with emissions data for year {0}")]
    NoCompaniesForYear(i32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ConfigError::NotPositive {
            name: "tons_per_particle",
            value: 0.0,
        };
        assert!(err.to_string().contains("tons_per_particle"));

        let err = DatasetError::NoCompaniesForYear(2019);
        assert_eq!(
            err.to_string(),
            "no companies found with emissions data for year 2019"
        );
    }
}
