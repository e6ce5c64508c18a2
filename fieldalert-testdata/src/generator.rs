// FieldAlert Testdata - Core generator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Core sensor stream generation.
//!
//! Produces realistic multi-depth soil moisture and canopy temperature
//! streams: ET-driven drying with a diurnal shape, rain events with
//! depth-lagged infiltration, canopy temperature correlated with moisture
//! stress, and Gaussian sensor noise.

use crate::scenario::Scenario;
use chrono::{DateTime, Duration, Timelike, Utc};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thiserror::Error;

/// Generator error types.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("num_samples must be positive")]
    EmptySampleCount,

    #[error("sample interval must be positive")]
    InvalidInterval,

    #[error("field capacity {fc} must exceed wilting point {pwp} within (0, 1)")]
    InvalidSoil { fc: f64, pwp: f64 },
}

/// Generator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Zone the stream belongs to.
    pub zone_id: String,
    /// First sample timestamp (UTC).
    pub start: DateTime<Utc>,
    /// Interval between samples in minutes.
    pub sample_interval_minutes: u32,
    /// Number of samples to generate.
    pub num_samples: usize,
    /// Random seed for reproducibility.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Field capacity of the simulated soil (cm³/cm³).
    pub field_capacity: f64,
    /// Permanent wilting point (cm³/cm³).
    pub wilting_point: f64,
    /// Scenario shaping drydown, rain, and canopy stress.
    #[serde(skip)]
    pub scenario: Scenario,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            zone_id: "demo-field".to_string(),
            // 2025-06-01 00:00:00 UTC
            start: DateTime::from_timestamp(1_748_736_000, 0).unwrap_or(DateTime::UNIX_EPOCH),
            sample_interval_minutes: 60,
            num_samples: 14 * 24, // two weeks hourly
            seed: None,
            field_capacity: 0.33, // Silt Loam
            wilting_point: 0.13,
            scenario: Scenario::Drydown,
        }
    }
}

impl GeneratorConfig {
    /// Create a new generator config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the zone id.
    pub fn with_zone_id(mut self, zone_id: &str) -> Self {
        self.zone_id = zone_id.to_string();
        self
    }

    /// Set the first sample timestamp.
    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = start;
        self
    }

    /// Set the sample interval in minutes.
    pub fn with_sample_interval_minutes(mut self, minutes: u32) -> Self {
        self.sample_interval_minutes = minutes;
        self
    }

    /// Set duration in days (calculates num_samples from the interval).
    pub fn with_duration_days(mut self, days: f64) -> Self {
        let total_minutes = days * 1440.0;
        self.num_samples =
            (total_minutes / self.sample_interval_minutes.max(1) as f64).ceil() as usize;
        self
    }

    /// Set the number of samples.
    pub fn with_num_samples(mut self, n: usize) -> Self {
        self.num_samples = n;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the soil's water holding bounds.
    pub fn with_soil(mut self, field_capacity: f64, wilting_point: f64) -> Self {
        self.field_capacity = field_capacity;
        self.wilting_point = wilting_point;
        self
    }

    /// Set the scenario.
    pub fn with_scenario(mut self, scenario: Scenario) -> Self {
        self.scenario = scenario;
        self
    }

    fn validate(&self) -> Result<(), GeneratorError> {
        if self.num_samples == 0 {
            return Err(GeneratorError::EmptySampleCount);
        }
        if self.sample_interval_minutes == 0 {
            return Err(GeneratorError::InvalidInterval);
        }
        let (fc, pwp) = (self.field_capacity, self.wilting_point);
        if !(0.0..1.0).contains(&pwp) || !(0.0..1.0).contains(&fc) || fc <= pwp {
            return Err(GeneratorError::InvalidSoil { fc, pwp });
        }
        Ok(())
    }
}

/// One generated sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticRecord {
    /// Sample timestamp (UTC).
    pub timestamp: DateTime<Utc>,
    /// Volumetric water content at 6 inches (cm³/cm³).
    pub sm_6in: f64,
    /// Volumetric water content at 12 inches.
    pub sm_12in: f64,
    /// Volumetric water content at 18 inches.
    pub sm_18in: f64,
    /// Canopy temperature (°C).
    pub canopy_temp_c: f64,
    /// Air temperature (°C).
    pub air_temp_c: f64,
    /// Relative humidity (%).
    pub relative_humidity_pct: f64,
    /// Rainfall since the previous sample (mm).
    pub rainfall_mm: f64,
}

/// A generated sensor stream for one zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorDataset {
    /// Zone the stream belongs to.
    pub zone_id: String,
    /// Samples in timestamp order.
    pub records: Vec<SyntheticRecord>,
}

impl SensorDataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Most recent sample (the current conditions).
    pub fn latest(&self) -> Option<&SyntheticRecord> {
        self.records.last()
    }

    /// Total rainfall over the stream (mm).
    pub fn total_rainfall_mm(&self) -> f64 {
        self.records.iter().map(|r| r.rainfall_mm).sum()
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// Depth-specific depletion factors: shallow dries fastest.
const DEPLETION_FACTORS: [f64; 3] = [1.0, 0.6, 0.3];
// Soil layer represented by each probe (mm), a third of the root zone.
const LAYER_MM: f64 = 304.8;
// Immediate VWC response per mm of rain, by depth.
const RAIN_RESPONSE: [f64; 3] = [0.0032, 0.0016, 0.0008];

/// Generate a sensor stream from configuration.
pub fn generate(config: &GeneratorConfig) -> Result<SensorDataset, GeneratorError> {
    config.validate()?;

    let mut rng: Box<dyn RngCore> = match config.seed {
        Some(s) => Box::new(StdRng::seed_from_u64(s)),
        None => Box::new(StdRng::from_entropy()),
    };

    let params = config.scenario.params();
    let fc = config.field_capacity;
    let pwp = config.wilting_point;
    let taw = fc - pwp;

    let interval_min = config.sample_interval_minutes as f64;
    let steps_per_day = ((1440.0 / interval_min).round() as usize).max(1);
    let lag_steps = ((720.0 / interval_min).round() as usize).max(1); // 12h infiltration tail

    // Initial moisture set by the scenario's starting depletion.
    let initial = pwp + (1.0 - params.start_depletion) * taw;
    let mut sm = [initial; 3];

    let rain_events = plan_rain_events(
        &mut *rng,
        params.rain_events,
        config.num_samples,
        steps_per_day,
    );

    let moisture_noise = Normal::new(0.0, 0.015).unwrap();
    let temp_noise = Normal::new(0.0, 0.8).unwrap();
    let rh_noise = Normal::new(0.0, 3.0).unwrap();

    let mut records = Vec::with_capacity(config.num_samples);

    for i in 0..config.num_samples {
        let timestamp =
            config.start + Duration::minutes(i as i64 * config.sample_interval_minutes as i64);
        let hour = timestamp.hour() as f64 + timestamp.minute() as f64 / 60.0;

        // Diurnal ET shape: peaks mid-afternoon, nothing at night.
        let diurnal = if (6.0..=20.0).contains(&hour) {
            (PI * (hour - 6.0) / 14.0).sin()
        } else {
            0.0
        };

        if i > 0 {
            // ET drawdown, split across layers by depletion factor.
            let et_step_mm =
                params.daily_et_mm * (PI / 28.0) * diurnal * (interval_min / 60.0);
            let factor_sum: f64 = DEPLETION_FACTORS.iter().sum();
            for (d, factor) in DEPLETION_FACTORS.iter().enumerate() {
                sm[d] -= et_step_mm * factor / factor_sum / LAYER_MM;
            }
        }

        // Rain: immediate surface response plus a lagged tail at depth.
        let mut rainfall_mm = 0.0;
        for &(event_step, amount) in &rain_events {
            if event_step == i {
                rainfall_mm += amount;
                for (d, response) in RAIN_RESPONSE.iter().enumerate() {
                    sm[d] += amount * response;
                }
            } else if event_step < i && i <= event_step + lag_steps {
                let tail =
                    (lag_steps - (i - event_step)) as f64 / lag_steps as f64;
                sm[1] += amount * 0.00012 * tail;
                sm[2] += amount * 0.00008 * tail;
            }
        }

        // Physically realistic band.
        for value in sm.iter_mut() {
            *value = value.clamp(pwp * 0.8, fc * 1.05);
        }

        // Air temperature: ~30°C with a daylight swing.
        let air_temp_c = if (6.0..=18.0).contains(&hour) {
            30.0 + 8.0 * (PI * (hour - 6.0) / 12.0).sin()
        } else {
            26.0
        } + temp_noise.sample(&mut *rng);

        // Canopy follows soil moisture stress: cooler than air when
        // transpiring freely, several degrees above when stressed.
        let stress = (1.0 - ((sm[0] + sm[1]) / 2.0 - pwp) / taw).clamp(0.0, 1.0);
        let canopy_temp_c = air_temp_c
            + (-2.0 + 7.0 * stress + params.canopy_bias_c)
            + 0.5 * temp_noise.sample(&mut *rng);

        // Humidity dips with daytime heating.
        let relative_humidity_pct =
            (78.0 - 22.0 * diurnal + rh_noise.sample(&mut *rng)).clamp(25.0, 95.0);

        records.push(SyntheticRecord {
            timestamp,
            sm_6in: (sm[0] + moisture_noise.sample(&mut *rng)).clamp(0.0, 1.0),
            sm_12in: (sm[1] + moisture_noise.sample(&mut *rng)).clamp(0.0, 1.0),
            sm_18in: (sm[2] + moisture_noise.sample(&mut *rng)).clamp(0.0, 1.0),
            canopy_temp_c,
            air_temp_c,
            relative_humidity_pct,
            rainfall_mm,
        });
    }

    Ok(SensorDataset {
        zone_id: config.zone_id.clone(),
        records,
    })
}

/// Pick rain event steps and amounts, avoiding the first and last day when
/// the stream is long enough.
fn plan_rain_events(
    rng: &mut dyn RngCore,
    (min_events, max_events): (usize, usize),
    num_samples: usize,
    steps_per_day: usize,
) -> Vec<(usize, f64)> {
    if max_events == 0 {
        return Vec::new();
    }
    let count = if min_events == max_events {
        max_events
    } else {
        rng.gen_range(min_events..=max_events)
    };

    let (offset, window) = if num_samples > 3 * steps_per_day {
        (steps_per_day, num_samples - 2 * steps_per_day)
    } else {
        (0, num_samples)
    };

    let count = count.min(window);
    let mut events: Vec<(usize, f64)> = rand::seq::index::sample(&mut *rng, window, count)
        .into_iter()
        .map(|idx| (offset + idx, rng.gen_range(5.0..25.0)))
        .collect();
    events.sort_by_key(|&(step, _)| step);
    events
}


#[cfg(feature = "engine")]
mod engine_adapter {
    use super::{SensorDataset, SyntheticRecord};
    use fieldalert::soil::Depth;
    use fieldalert::RawObservation;

    impl SyntheticRecord {
        /// Convert to a raw observation for the given zone.
        pub fn to_raw_observation(&self, zone_id: &str) -> RawObservation {
            RawObservation::new(zone_id, self.timestamp, self.canopy_temp_c, self.air_temp_c)
                .with_depth(Depth::Six, self.sm_6in)
                .with_depth(Depth::Twelve, self.sm_12in)
                .with_depth(Depth::Eighteen, self.sm_18in)
                .with_relative_humidity(self.relative_humidity_pct)
                .with_rainfall(self.rainfall_mm)
        }
    }

    impl SensorDataset {
        /// Convert the whole stream to raw observations for its zone.
        pub fn to_raw_observations(&self) -> Vec<RawObservation> {
            self.records
                .iter()
                .map(|r| r.to_raw_observation(&self.zone_id))
                .collect()
        }
    }
}

#[cfg(all(test, feature = "engine"))]
mod engine_tests {
    use super::*;
    use fieldalert::balance::ReferenceEtEstimator;
    use fieldalert::soil::{SoilProfile, TextureClass};
    use fieldalert::{EngineConfig, FieldAlertEngine, ZoneConfig};

    #[test]
    fn test_stream_drives_engine_end_to_end() {
        let dataset = generate(
            &GeneratorConfig::new()
                .with_seed(7)
                .with_zone_id("gen-zone")
                .with_duration_days(7.0),
        )
        .unwrap();

        let mut engine = FieldAlertEngine::new(
            EngineConfig::default(),
            Box::new(ReferenceEtEstimator::diurnal(7.0)),
        )
        .unwrap();
        engine
            .register_zone(
                "gen-zone",
                ZoneConfig::new(SoilProfile::from_texture(TextureClass::SiltLoam), "corn"),
            )
            .unwrap();

        let report = engine.ingest_batch(&dataset.to_raw_observations());
        assert!(report.is_complete(), "{:?}", report.failure);
        assert_eq!(report.accepted, dataset.len());

        let record = engine.evaluate("gen-zone").unwrap();
        assert!((0.0..=1.0).contains(&record.cwsi));
    }
}
