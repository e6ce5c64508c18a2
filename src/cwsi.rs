// FieldAlert - Irrigation decision engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Crop Water Stress Index computation.
//!
//! Empirical two-line (Idso) model: the observed canopy-minus-air
//! temperature differential is positioned between a non-water-stressed lower
//! baseline (a linear function of VPD) and a non-transpiring upper baseline.
//! The index is clamped to [0, 1]: 0 at the lower baseline (no stress),
//! 1 at the upper (maximum stress).

use crate::config::{CwsiBaseline, CwsiBaselines};
use crate::error::{ComputationError, ConfigError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum baseline spread (°C) before the model is considered degenerate.
pub const MIN_BASELINE_SPREAD_C: f64 = 1e-3;

/// Result of one CWSI computation, kept per zone as its most recent value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CwsiState {
    /// Stress index in [0, 1].
    pub index: f64,

    /// Observed canopy-minus-air differential (°C).
    pub delta_t_c: f64,

    /// Lower (non-water-stressed) baseline at the observed VPD (°C).
    pub lower_baseline_c: f64,

    /// Upper (non-transpiring) baseline (°C).
    pub upper_baseline_c: f64,

    /// VPD used for the computation (kPa).
    pub vpd_kpa: f64,

    /// Timestamp of the observation the index was computed from.
    pub timestamp: DateTime<Utc>,
}

impl CwsiState {
    /// Whether the canopy is at or beyond the non-transpiring limit.
    pub fn is_saturated(&self) -> bool {
        self.index >= 1.0
    }
}

/// Stateless CWSI calculator for one crop's baselines.
#[derive(Debug, Clone)]
pub struct CwsiCalculator {
    baseline: CwsiBaseline,
}

impl CwsiCalculator {
    pub fn new(baseline: CwsiBaseline) -> Self {
        Self { baseline }
    }

    /// Resolve the calculator for a crop, failing if no baseline is
    /// configured. There is no fallback baseline.
    pub fn for_crop(baselines: &CwsiBaselines, crop: &str) -> Result<Self, ConfigError> {
        baselines
            .get(crop)
            .copied()
            .map(Self::new)
            .ok_or_else(|| ConfigError::MissingCwsiBaseline(crop.to_string()))
    }

    pub fn baseline(&self) -> &CwsiBaseline {
        &self.baseline
    }

    /// Lower baseline ΔT at a given VPD (°C).
    pub fn lower_baseline_c(&self, vpd_kpa: f64) -> f64 {
        self.baseline.lower_intercept_c + self.baseline.lower_slope_c_per_kpa * vpd_kpa
    }

    /// Compute the index for one observation.
    pub fn compute(
        &self,
        canopy_temp_c: f64,
        air_temp_c: f64,
        vpd_kpa: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<CwsiState, ComputationError> {
        let delta_t_c = canopy_temp_c - air_temp_c;
        let lower_baseline_c = self.lower_baseline_c(vpd_kpa);
        let upper_baseline_c = self.baseline.upper_delta_c;

        let spread = upper_baseline_c - lower_baseline_c;
        if !spread.is_finite() || spread <= MIN_BASELINE_SPREAD_C {
            return Err(ComputationError::DegenerateBaseline {
                spread,
                min: MIN_BASELINE_SPREAD_C,
                vpd: vpd_kpa,
            });
        }

        let index = ((delta_t_c - lower_baseline_c) / spread).clamp(0.0, 1.0);

        Ok(CwsiState {
            index,
            delta_t_c,
            lower_baseline_c,
            upper_baseline_c,
            vpd_kpa,
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 14, 0, 0).unwrap()
    }

    fn corn() -> CwsiCalculator {
        CwsiCalculator::for_crop(&CwsiBaselines::default(), "corn").unwrap()
    }

    #[test]
    fn test_missing_baseline_fails() {
        let result = CwsiCalculator::for_crop(&CwsiBaselines::default(), "sorghum");
        assert!(matches!(
            result,
            Err(ConfigError::MissingCwsiBaseline(_))
        ));
    }

    #[test]
    fn test_index_zero_at_lower_baseline() {
        let calc = corn();
        let vpd = 2.0;
        let lower = calc.lower_baseline_c(vpd);

        // Canopy exactly on the non-water-stressed line.
        let state = calc.compute(25.0 + lower, 25.0, vpd, ts()).unwrap();
        assert_relative_eq!(state.index, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_index_one_at_upper_baseline() {
        let calc = corn();
        let state = calc.compute(25.0 + 4.6, 25.0, 2.0, ts()).unwrap();
        assert_relative_eq!(state.index, 1.0, epsilon = 1e-12);
        assert!(state.is_saturated());
    }

    #[test]
    fn test_index_clamped_below_zero() {
        let calc = corn();
        // Well-watered canopy far cooler than the lower baseline predicts.
        let state = calc.compute(15.0, 25.0, 2.0, ts()).unwrap();
        assert_eq!(state.index, 0.0);
    }

    #[test]
    fn test_index_clamped_above_one() {
        let calc = corn();
        let state = calc.compute(35.0, 25.0, 2.0, ts()).unwrap();
        assert_eq!(state.index, 1.0);
    }

    #[test]
    fn test_index_midway() {
        let calc = corn();
        let vpd = 2.0;
        let lower = calc.lower_baseline_c(vpd);
        let upper = 4.6;
        let mid = (lower + upper) / 2.0;

        let state = calc.compute(25.0 + mid, 25.0, vpd, ts()).unwrap();
        assert_relative_eq!(state.index, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_higher_vpd_lowers_baseline() {
        let calc = corn();
        // Slope is negative: drier air means a cooler unstressed canopy.
        assert!(calc.lower_baseline_c(3.0) < calc.lower_baseline_c(1.0));
    }

    #[test]
    fn test_degenerate_baseline_fails() {
        let calc = CwsiCalculator::new(CwsiBaseline {
            lower_intercept_c: 4.6,
            lower_slope_c_per_kpa: 0.0,
            upper_delta_c: 4.6,
        });

        let result = calc.compute(26.0, 25.0, 2.0, ts());
        assert!(matches!(
            result,
            Err(ComputationError::DegenerateBaseline { .. })
        ));
    }

    #[test]
    fn test_inverted_baselines_fail() {
        // Upper below lower at low VPD: configuration nonsense, not a panic.
        let calc = CwsiCalculator::new(CwsiBaseline {
            lower_intercept_c: 6.0,
            lower_slope_c_per_kpa: -1.0,
            upper_delta_c: 4.0,
        });

        let result = calc.compute(26.0, 25.0, 0.5, ts());
        assert!(matches!(
            result,
            Err(ComputationError::DegenerateBaseline { .. })
        ));
    }

    #[test]
    fn test_state_serialization() {
        let state = corn().compute(27.0, 25.0, 1.5, ts()).unwrap();
        let json = serde_json::to_string(&state).unwrap();
        let parsed: CwsiState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
    }
}
