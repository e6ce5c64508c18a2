// FieldAlert - Irrigation decision engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Engine configuration.
//!
//! Static for a session: reloading configuration for a zone requires
//! re-registering that zone, which resets its state.

use crate::error::ConfigError;
use crate::soil::SoilProfile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Master configuration for the decision engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Observation validation settings.
    pub ingest: IngestConfig,

    /// Default trigger thresholds (zones may override).
    pub thresholds: TriggerThresholds,

    /// CWSI baselines keyed by crop.
    pub baselines: CwsiBaselines,

    /// Maximum number of registered zones.
    pub max_zones: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ingest: IngestConfig::default(),
            thresholds: TriggerThresholds::default(),
            baselines: CwsiBaselines::default(),
            max_zones: 64,
        }
    }
}

/// Observation validation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Lower bound of the plausible temperature range (°C).
    pub temp_min_c: f64,

    /// Upper bound of the plausible temperature range (°C).
    pub temp_max_c: f64,

    /// Cosmetic rounding noise tolerance for volumetric water content.
    /// Excursions within this band are clamped; anything beyond is rejected.
    pub vwc_epsilon: f64,

    /// Cosmetic rounding noise tolerance for relative humidity (%).
    pub rh_epsilon_pct: f64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            temp_min_c: -10.0,
            temp_max_c: 60.0,
            vwc_epsilon: 0.005,
            rh_epsilon_pct: 0.5,
        }
    }
}

/// Irrigation trigger thresholds, captured into every decision record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerThresholds {
    /// Management allowable depletion: trigger when SMD reaches this
    /// fraction of effective WHC.
    pub smd_depletion: f64,

    /// Trigger when CWSI reaches this value.
    pub cwsi: f64,
}

impl Default for TriggerThresholds {
    fn default() -> Self {
        Self {
            smd_depletion: 0.50,
            cwsi: 0.6,
        }
    }
}

impl TriggerThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.smd_depletion.is_finite() || self.smd_depletion <= 0.0 || self.smd_depletion > 1.0
        {
            return Err(ConfigError::InvalidSmdThreshold(self.smd_depletion));
        }
        if !self.cwsi.is_finite() || self.cwsi <= 0.0 || self.cwsi > 1.0 {
            return Err(ConfigError::InvalidCwsiThreshold(self.cwsi));
        }
        Ok(())
    }
}

/// Idso two-line CWSI baseline parameters for one crop.
///
/// Lower (non-water-stressed) line: ΔT = intercept + slope × VPD.
/// Upper (non-transpiring) line: constant ΔT offset, not VPG-adjusted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CwsiBaseline {
    /// Lower baseline intercept (°C).
    pub lower_intercept_c: f64,

    /// Lower baseline slope (°C per kPa of VPD).
    pub lower_slope_c_per_kpa: f64,

    /// Upper baseline canopy-minus-air temperature (°C).
    pub upper_delta_c: f64,
}

/// CWSI baselines keyed by crop name (lowercase).
///
/// Defaults carry the published Idso parameters for the crops the original
/// field deployments grew. Missing crops fail with
/// [`ConfigError::MissingCwsiBaseline`]; there is no fallback baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CwsiBaselines(BTreeMap<String, CwsiBaseline>);

impl Default for CwsiBaselines {
    fn default() -> Self {
        let mut map = BTreeMap::new();
        map.insert(
            "corn".to_string(),
            CwsiBaseline {
                lower_intercept_c: 3.11,
                lower_slope_c_per_kpa: -1.97,
                upper_delta_c: 4.6,
            },
        );
        map.insert(
            "cotton".to_string(),
            CwsiBaseline {
                lower_intercept_c: 1.49,
                lower_slope_c_per_kpa: -2.09,
                upper_delta_c: 5.0,
            },
        );
        Self(map)
    }
}

impl CwsiBaselines {
    /// Empty baseline table.
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Look up the baseline for a crop (case-insensitive).
    pub fn get(&self, crop: &str) -> Option<&CwsiBaseline> {
        self.0.get(&crop.to_lowercase())
    }

    /// Insert or replace a crop baseline.
    pub fn insert(&mut self, crop: &str, baseline: CwsiBaseline) {
        self.0.insert(crop.to_lowercase(), baseline);
    }

    pub fn contains(&self, crop: &str) -> bool {
        self.0.contains_key(&crop.to_lowercase())
    }

    pub fn crops(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }
}

/// Per-zone configuration supplied at registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Soil profile for the zone.
    pub soil: SoilProfile,

    /// Crop grown in the zone; selects the CWSI baseline.
    pub crop: String,

    /// Optional per-zone threshold override. When absent, the engine's
    /// default thresholds apply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<TriggerThresholds>,
}

impl ZoneConfig {
    pub fn new(soil: SoilProfile, crop: impl Into<String>) -> Self {
        Self {
            soil,
            crop: crop.into(),
            thresholds: None,
        }
    }

    /// Builder: override the engine-wide trigger thresholds for this zone.
    pub fn with_thresholds(mut self, thresholds: TriggerThresholds) -> Self {
        self.thresholds = Some(thresholds);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soil::TextureClass;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.max_zones, 64);
        assert_eq!(config.thresholds.smd_depletion, 0.50);
        assert_eq!(config.thresholds.cwsi, 0.6);
        assert_eq!(config.ingest.temp_min_c, -10.0);
        assert_eq!(config.ingest.temp_max_c, 60.0);
    }

    #[test]
    fn test_config_serialization() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.max_zones, config.max_zones);
        assert_eq!(parsed.thresholds, config.thresholds);
    }

    #[test]
    fn test_threshold_validation() {
        assert!(TriggerThresholds::default().validate().is_ok());

        let bad = TriggerThresholds {
            smd_depletion: 0.0,
            cwsi: 0.6,
        };
        assert!(matches!(
            bad.validate(),
            Err(ConfigError::InvalidSmdThreshold(_))
        ));

        let bad = TriggerThresholds {
            smd_depletion: 0.5,
            cwsi: 1.5,
        };
        assert!(matches!(
            bad.validate(),
            Err(ConfigError::InvalidCwsiThreshold(_))
        ));
    }

    #[test]
    fn test_baselines_lookup_case_insensitive() {
        let baselines = CwsiBaselines::default();
        assert!(baselines.get("corn").is_some());
        assert!(baselines.get("Corn").is_some());
        assert!(baselines.get("sorghum").is_none());
    }

    #[test]
    fn test_baselines_insert() {
        let mut baselines = CwsiBaselines::empty();
        assert!(!baselines.contains("wheat"));
        baselines.insert(
            "Wheat",
            CwsiBaseline {
                lower_intercept_c: 2.0,
                lower_slope_c_per_kpa: -1.5,
                upper_delta_c: 4.0,
            },
        );
        assert!(baselines.contains("wheat"));
        assert_eq!(baselines.crops().count(), 1);
    }

    #[test]
    fn test_zone_config_builder() {
        let config = ZoneConfig::new(
            SoilProfile::from_texture(TextureClass::SiltLoam),
            "corn",
        )
        .with_thresholds(TriggerThresholds {
            smd_depletion: 0.40,
            cwsi: 0.5,
        });

        assert_eq!(config.crop, "corn");
        assert_eq!(config.thresholds.unwrap().smd_depletion, 0.40);
    }
}
