// FieldAlert Testdata - Synthetic sensor stream generator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # FieldAlert Testdata
//!
//! Synthetic multi-depth soil moisture and canopy temperature streams for
//! testing, demos, and backtesting the FieldAlert engine.
//!
//! The generator reproduces the signal structure of real field telemetry:
//!
//! - **ET drydown**: diurnal sine profile (06:00–20:00), shallow layers
//!   drying faster than deep ones
//! - **Rain events**: immediate surface response with a 12-hour lagged
//!   infiltration tail at depth
//! - **Canopy stress**: canopy-minus-air offset tracking profile moisture,
//!   from cooler-than-air when transpiring to several degrees above when dry
//! - **Sensor noise**: Gaussian, per reading
//!
//! ## Quick Start
//!
//! ```rust
//! use fieldalert_testdata::{generate, GeneratorConfig, Scenario};
//!
//! let config = GeneratorConfig::new()
//!     .with_zone_id("demo-field")
//!     .with_duration_days(7.0)
//!     .with_scenario(Scenario::RainRelief)
//!     .with_seed(42);
//!
//! let dataset = generate(&config).unwrap();
//! assert_eq!(dataset.len(), 168);
//! assert!(dataset.total_rainfall_mm() > 0.0);
//! ```
//!
//! ## Engine integration
//!
//! With the `engine` feature, generated records convert straight into raw
//! observations:
//!
//! ```ignore
//! let raws = dataset.to_raw_observations();
//! let report = engine.ingest_batch(&raws);
//! ```

pub mod generator;
pub mod scenario;

// Re-exports for convenience
pub use generator::{
    generate, GeneratorConfig, GeneratorError, SensorDataset, SyntheticRecord,
};
pub use scenario::Scenario;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_quick_start_shape() {
        let dataset = generate(
            &GeneratorConfig::new()
                .with_duration_days(1.0)
                .with_seed(1),
        )
        .unwrap();
        assert_eq!(dataset.len(), 24);
        assert!(dataset.latest().is_some());
    }
}
