// FieldAlert - Irrigation decision engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Observation ingest: raw sensor records, validation, and normalization.
//!
//! Raw records arrive as [`RawObservation`] (a permissive serde schema, also
//! parseable from JSON) and are turned into validated [`Observation`]s by
//! [`ObservationIngest::normalize`]. Out-of-range physical values are
//! rejected, never clamped; only cosmetic rounding noise within the
//! configured epsilon is clamped. Normalization never mutates zone state.

use crate::config::IngestConfig;
use crate::error::{EngineError, Result, ValidationError};
use crate::soil::Depth;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw observation as delivered by a collaborator (gateway, file import,
/// manual entry).
///
/// Example JSON:
/// ```json
/// {
///   "zone_id": "north-40",
///   "timestamp": "2025-07-01T06:00:00Z",
///   "soil_moisture": {"6in": 0.27, "12in": 0.29, "18in": 0.31},
///   "canopy_temp_c": 24.5,
///   "air_temp_c": 23.0,
///   "relative_humidity_pct": 45.0,
///   "rainfall_mm": 0.0
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    /// Zone identifier.
    pub zone_id: String,

    /// Observation timestamp (UTC).
    pub timestamp: DateTime<Utc>,

    /// Depth-keyed volumetric water content (cm³/cm³). Partial depth sets
    /// are allowed; an empty map means no soil readings this tick.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub soil_moisture: BTreeMap<Depth, f64>,

    /// Canopy temperature from the infrared sensor (°C).
    pub canopy_temp_c: f64,

    /// Ambient air temperature (°C).
    pub air_temp_c: f64,

    /// Relative humidity (%), if the station reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_humidity_pct: Option<f64>,

    /// Vapor pressure deficit (kPa), if already resolved upstream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpd_kpa: Option<f64>,

    /// Rainfall since the previous observation (mm).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rainfall_mm: Option<f64>,
}

impl RawObservation {
    /// Create a record with the required fields.
    pub fn new(
        zone_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        canopy_temp_c: f64,
        air_temp_c: f64,
    ) -> Self {
        Self {
            zone_id: zone_id.into(),
            timestamp,
            soil_moisture: BTreeMap::new(),
            canopy_temp_c,
            air_temp_c,
            relative_humidity_pct: None,
            vpd_kpa: None,
            rainfall_mm: None,
        }
    }

    /// Builder: add a soil moisture reading at a depth.
    pub fn with_depth(mut self, depth: Depth, vwc: f64) -> Self {
        self.soil_moisture.insert(depth, vwc);
        self
    }

    /// Builder: add relative humidity.
    pub fn with_relative_humidity(mut self, pct: f64) -> Self {
        self.relative_humidity_pct = Some(pct);
        self
    }

    /// Builder: add an upstream-resolved VPD.
    pub fn with_vpd(mut self, kpa: f64) -> Self {
        self.vpd_kpa = Some(kpa);
        self
    }

    /// Builder: add rainfall since the previous observation.
    pub fn with_rainfall(mut self, mm: f64) -> Self {
        self.rainfall_mm = Some(mm);
        self
    }

    /// Parse from JSON string.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Validated, normalized observation.
///
/// VPD is resolved at normalization: the upstream value if supplied,
/// otherwise derived from relative humidity and air temperature, otherwise
/// absent. Rainfall defaults to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub zone_id: String,
    pub timestamp: DateTime<Utc>,
    pub soil_moisture: BTreeMap<Depth, f64>,
    pub canopy_temp_c: f64,
    pub air_temp_c: f64,
    pub vpd_kpa: Option<f64>,
    pub rainfall_mm: f64,
}

impl Observation {
    /// Canopy-minus-air temperature differential (°C).
    pub fn delta_t_c(&self) -> f64 {
        self.canopy_temp_c - self.air_temp_c
    }

    /// Depths carrying a reading in this observation.
    pub fn depths_present(&self) -> Vec<Depth> {
        self.soil_moisture.keys().copied().collect()
    }

    /// Whether any soil moisture reading is present.
    pub fn has_soil_readings(&self) -> bool {
        !self.soil_moisture.is_empty()
    }
}

/// Saturation vapor pressure (kPa) at a temperature, Tetens formula.
pub fn saturation_vapor_pressure_kpa(temp_c: f64) -> f64 {
    0.6108 * (17.27 * temp_c / (temp_c + 237.3)).exp()
}

/// Vapor pressure deficit (kPa) from air temperature and relative humidity.
pub fn vpd_from_rh(air_temp_c: f64, rh_pct: f64) -> f64 {
    saturation_vapor_pressure_kpa(air_temp_c) * (1.0 - rh_pct / 100.0)
}

/// Stateless validator turning raw records into [`Observation`]s.
pub struct ObservationIngest {
    config: IngestConfig,
}

impl ObservationIngest {
    pub fn new(config: IngestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Validate and normalize a raw record.
    ///
    /// `last_accepted` is the zone's last accepted timestamp; the submitted
    /// timestamp must be strictly greater. Rejection leaves nothing behind,
    /// so resubmitting a corrected record is always possible.
    pub fn normalize(
        &self,
        raw: &RawObservation,
        last_accepted: Option<DateTime<Utc>>,
    ) -> Result<Observation> {
        if raw.zone_id.is_empty() {
            return Err(ValidationError::EmptyZoneId.into());
        }

        if let Some(last) = last_accepted {
            if raw.timestamp <= last {
                return Err(EngineError::TemporalOrder {
                    zone: raw.zone_id.clone(),
                    last,
                    submitted: raw.timestamp,
                });
            }
        }

        self.check_temperature("canopy", raw.canopy_temp_c)?;
        self.check_temperature("air", raw.air_temp_c)?;

        let mut soil_moisture = BTreeMap::new();
        for (&depth, &vwc) in &raw.soil_moisture {
            soil_moisture.insert(depth, self.check_vwc(depth, vwc)?);
        }

        let rainfall_mm = match raw.rainfall_mm {
            Some(mm) if !mm.is_finite() => {
                return Err(ValidationError::NonFinite("rainfall_mm").into())
            }
            Some(mm) if mm < 0.0 => return Err(ValidationError::NegativeRainfall(mm).into()),
            Some(mm) => mm,
            None => 0.0,
        };

        let vpd_kpa = self.resolve_vpd(raw)?;

        Ok(Observation {
            zone_id: raw.zone_id.clone(),
            timestamp: raw.timestamp,
            soil_moisture,
            canopy_temp_c: raw.canopy_temp_c,
            air_temp_c: raw.air_temp_c,
            vpd_kpa,
            rainfall_mm,
        })
    }

    fn check_temperature(&self, field: &'static str, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(ValidationError::NonFinite(field).into());
        }
        if value < self.config.temp_min_c || value > self.config.temp_max_c {
            return Err(ValidationError::TemperatureOutOfRange {
                field,
                value,
                min: self.config.temp_min_c,
                max: self.config.temp_max_c,
            }
            .into());
        }
        Ok(())
    }

    fn check_vwc(&self, depth: Depth, value: f64) -> Result<f64> {
        if !value.is_finite() {
            return Err(ValidationError::NonFinite("soil_moisture").into());
        }
        let eps = self.config.vwc_epsilon;
        if value < -eps || value > 1.0 + eps {
            return Err(ValidationError::MoistureOutOfRange { depth, value }.into());
        }
        // Rounding noise only; genuine excursions were rejected above.
        Ok(value.clamp(0.0, 1.0))
    }

    fn resolve_vpd(&self, raw: &RawObservation) -> Result<Option<f64>> {
        if let Some(vpd) = raw.vpd_kpa {
            if !vpd.is_finite() {
                return Err(ValidationError::NonFinite("vpd_kpa").into());
            }
            if vpd < 0.0 {
                return Err(ValidationError::VpdOutOfRange(vpd).into());
            }
            return Ok(Some(vpd));
        }

        if let Some(rh) = raw.relative_humidity_pct {
            if !rh.is_finite() {
                return Err(ValidationError::NonFinite("relative_humidity_pct").into());
            }
            let eps = self.config.rh_epsilon_pct;
            if rh < -eps || rh > 100.0 + eps {
                return Err(ValidationError::HumidityOutOfRange(rh).into());
            }
            let rh = rh.clamp(0.0, 100.0);
            return Ok(Some(vpd_from_rh(raw.air_temp_c, rh)));
        }

        Ok(None)
    }
}

impl Default for ObservationIngest {
    fn default() -> Self {
        Self::new(IngestConfig::default())
    }
}
