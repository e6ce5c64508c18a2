// FieldAlert - Irrigation decision engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Soil water balance tracking.
//!
//! [`WaterBalanceTracker`] maintains the running soil moisture deficit (SMD)
//! for one zone: a lumped-bucket model updated by estimated ET and rainfall,
//! reconciled against directly sensed soil moisture whenever depth readings
//! are present. Sensor data is ground truth; the bucket projection fills the
//! gaps between readings.
//!
//! Updates are atomic: [`WaterBalanceTracker::project`] computes a candidate
//! state without touching the current one, and [`WaterBalanceTracker::commit`]
//! installs it. [`WaterBalanceTracker::update`] combines the two for callers
//! that have nothing else to stage.

use crate::error::{ComputationError, EngineError, Result};
use crate::observation::Observation;
use crate::soil::{Depth, SoilProfile};
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Injected evapotranspiration estimator.
///
/// An external collaborator: the tracker consumes a rate in mm/day averaged
/// over the requested window, it does not compute ET physics itself.
pub trait EtEstimator {
    fn estimate_et(
        &self,
        zone_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> std::result::Result<f64, ComputationError>;
}

/// Built-in estimator for tests, demos, and backtesting.
///
/// Either a flat daily rate, or the same daily total shaped by a sinusoidal
/// daylight profile (06:00–20:00 UTC, peaking mid-afternoon). Production
/// estimators (Penman-Monteith from a weather feed, typically) live outside
/// the core.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceEtEstimator {
    daily_et_mm: f64,
    diurnal: bool,
}

impl ReferenceEtEstimator {
    /// Flat rate: the same mm/day regardless of window.
    pub fn constant(daily_et_mm: f64) -> Self {
        Self {
            daily_et_mm,
            diurnal: false,
        }
    }

    /// Daily total distributed over a sinusoidal daylight window.
    pub fn diurnal(daily_et_mm: f64) -> Self {
        Self {
            daily_et_mm,
            diurnal: true,
        }
    }

    /// ET depth (mm) accumulated between two instants under the diurnal
    /// profile. The profile integrates to the daily total over any full day.
    fn diurnal_depth_mm(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
        let mut total = 0.0;
        let mut day = from.date_naive();
        let last_day = to.date_naive();

        while day <= last_day {
            let day_start = Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN));
            let window_start = if from > day_start { from } else { day_start };
            let day_end = day_start + chrono::Duration::days(1);
            let window_end = if to < day_end { to } else { day_end };

            if window_end > window_start {
                let a = ((window_start - day_start).num_seconds() as f64 / 3600.0).max(6.0);
                let b = ((window_end - day_start).num_seconds() as f64 / 3600.0).min(20.0);
                if b > a {
                    // ∫ sin(π(h-6)/14) dh over [a,b], scaled so a full
                    // daylight window integrates to daily_et_mm.
                    total += self.daily_et_mm / 2.0
                        * ((PI * (a - 6.0) / 14.0).cos() - (PI * (b - 6.0) / 14.0).cos());
                }
            }

            day = match day.succ_opt() {
                Some(d) => d,
                None => break,
            };
        }

        total
    }
}

impl EtEstimator for ReferenceEtEstimator {
    fn estimate_et(
        &self,
        _zone_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> std::result::Result<f64, ComputationError> {
        let secs = (to - from).num_seconds();
        if secs <= 0 {
            return Err(ComputationError::EtEstimator(format!(
                "non-positive window: {from} to {to}"
            )));
        }

        if !self.diurnal {
            return Ok(self.daily_et_mm);
        }

        let days = secs as f64 / 86_400.0;
        Ok(self.diurnal_depth_mm(from, to) / days)
    }
}

/// Running water balance for one zone.
///
/// Owned exclusively by the zone's tracker; created on the first observation
/// and never deleted during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterBalanceState {
    /// Current soil moisture deficit below field capacity (mm).
    pub smd_mm: f64,

    /// Effective WHC (mm) used for the latest update, over the depths that
    /// were present.
    pub effective_whc_mm: f64,

    /// Cumulative estimated ET since the last irrigation event (mm).
    pub cumulative_et_mm: f64,

    /// Cumulative rainfall since the last irrigation event (mm).
    pub cumulative_rain_mm: f64,

    /// Timestamp of the last applied observation.
    pub last_update: DateTime<Utc>,

    /// Timestamp of the last irrigation event, if any.
    pub last_irrigation: Option<DateTime<Utc>>,
}

impl WaterBalanceState {
    /// SMD as a fraction of effective WHC.
    pub fn depletion_fraction(&self) -> f64 {
        if self.effective_whc_mm > 0.0 {
            self.smd_mm / self.effective_whc_mm
        } else {
            0.0
        }
    }
}

/// Per-zone water balance tracker.
pub struct WaterBalanceTracker {
    zone_id: String,
    profile: SoilProfile,
    state: Option<WaterBalanceState>,
}

impl WaterBalanceTracker {
    pub fn new(zone_id: impl Into<String>, profile: SoilProfile) -> Self {
        Self {
            zone_id: zone_id.into(),
            profile,
            state: None,
        }
    }

    pub fn state(&self) -> Option<&WaterBalanceState> {
        self.state.as_ref()
    }

    pub fn profile(&self) -> &SoilProfile {
        &self.profile
    }

    /// Compute the candidate state for an observation without committing it.
    pub fn project(
        &self,
        obs: &Observation,
        et: &dyn EtEstimator,
    ) -> Result<WaterBalanceState> {
        let prev = match &self.state {
            // First observation: full profile at field capacity.
            None => {
                let effective_whc_mm = self.profile.effective_whc(&Depth::ALL)?;
                return Ok(WaterBalanceState {
                    smd_mm: 0.0,
                    effective_whc_mm,
                    cumulative_et_mm: 0.0,
                    cumulative_rain_mm: 0.0,
                    last_update: obs.timestamp,
                    last_irrigation: None,
                });
            }
            Some(prev) => prev,
        };

        // Ingest enforces ordering; re-validate here so a tracker driven
        // directly cannot corrupt its bucket.
        let dt_secs = (obs.timestamp - prev.last_update).num_seconds();
        if dt_secs <= 0 {
            return Err(EngineError::TemporalOrder {
                zone: self.zone_id.clone(),
                last: prev.last_update,
                submitted: obs.timestamp,
            });
        }
        let dt_days = dt_secs as f64 / 86_400.0;

        let rate = et.estimate_et(&self.zone_id, prev.last_update, obs.timestamp)?;
        if !rate.is_finite() || rate < 0.0 {
            return Err(ComputationError::InvalidEtRate(rate).into());
        }
        let et_mm = rate * dt_days;
        let rain_mm = obs.rainfall_mm;

        let present = obs.depths_present();
        let (effective_whc_mm, raw_smd) = if present.is_empty() {
            // No sensor data this tick: pure bucket projection.
            let whc = self.profile.effective_whc(&Depth::ALL)?;
            (whc, prev.smd_mm + et_mm - rain_mm)
        } else {
            // Sensor data is ground truth: reconcile to the measured deficit.
            let whc = self.profile.effective_whc(&present)?;
            (whc, self.profile.deficit_mm(&obs.soil_moisture)?)
        };

        if !effective_whc_mm.is_finite() || effective_whc_mm <= 0.0 {
            return Err(ComputationError::InvalidEffectiveWhc(effective_whc_mm).into());
        }

        Ok(WaterBalanceState {
            smd_mm: raw_smd.clamp(0.0, effective_whc_mm),
            effective_whc_mm,
            cumulative_et_mm: prev.cumulative_et_mm + et_mm,
            cumulative_rain_mm: prev.cumulative_rain_mm + rain_mm,
            last_update: obs.timestamp,
            last_irrigation: prev.last_irrigation,
        })
    }

    /// Install a previously projected state.
    pub fn commit(&mut self, state: WaterBalanceState) {
        self.state = Some(state);
    }

    /// Project and commit in one step.
    pub fn update(
        &mut self,
        obs: &Observation,
        et: &dyn EtEstimator,
    ) -> Result<&WaterBalanceState> {
        let next = self.project(obs, et)?;
        Ok(self.state.insert(next))
    }

    /// Apply an irrigation event: SMD returns to zero (field capacity) and
    /// the since-irrigation counters restart. A zone that has not yet seen
    /// an observation gets fresh state stamped with the event time.
    pub fn record_irrigation(&mut self, timestamp: DateTime<Utc>) -> Result<()> {
        let next = match self.state.take() {
            Some(mut state) => {
                state.smd_mm = 0.0;
                state.cumulative_et_mm = 0.0;
                state.cumulative_rain_mm = 0.0;
                state.last_irrigation = Some(timestamp);
                state
            }
            None => WaterBalanceState {
                smd_mm: 0.0,
                effective_whc_mm: self.profile.effective_whc(&Depth::ALL)?,
                cumulative_et_mm: 0.0,
                cumulative_rain_mm: 0.0,
                last_update: timestamp,
                last_irrigation: Some(timestamp),
            },
        };
        self.state = Some(next);
        log::debug!(
            "zone '{}': irrigation recorded at {}, SMD reset to field capacity",
            self.zone_id,
            timestamp
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soil::TextureClass;
    use approx::assert_relative_eq;
    use std::collections::BTreeMap;

    fn ts(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, day, hour, 0, 0).unwrap()
    }

    fn obs_bare(timestamp: DateTime<Utc>) -> Observation {
        Observation {
            zone_id: "zone-a".to_string(),
            timestamp,
            soil_moisture: BTreeMap::new(),
            canopy_temp_c: 26.0,
            air_temp_c: 24.0,
            vpd_kpa: Some(1.5),
            rainfall_mm: 0.0,
        }
    }

    fn obs_with_vwc(timestamp: DateTime<Utc>, vwc: f64) -> Observation {
        let mut obs = obs_bare(timestamp);
        obs.soil_moisture = Depth::ALL.iter().map(|&d| (d, vwc)).collect();
        obs
    }

    fn tracker() -> WaterBalanceTracker {
        WaterBalanceTracker::new("zone-a", SoilProfile::from_texture(TextureClass::SiltLoam))
    }

    #[test]
    fn test_first_observation_initializes_at_field_capacity() {
        let mut t = tracker();
        let et = ReferenceEtEstimator::constant(6.0);

        let state = t.update(&obs_bare(ts(1, 6)), &et).unwrap();
        assert_eq!(state.smd_mm, 0.0);
        assert_eq!(state.cumulative_et_mm, 0.0);
        assert!(state.last_irrigation.is_none());
        assert_relative_eq!(state.effective_whc_mm, 0.20 * 914.4, epsilon = 1e-9);
    }

    #[test]
    fn test_projection_accumulates_et() {
        let mut t = tracker();
        let et = ReferenceEtEstimator::constant(6.0);

        t.update(&obs_bare(ts(1, 0)), &et).unwrap();
        let state = t.update(&obs_bare(ts(2, 0)), &et).unwrap();

        // One day at 6 mm/day, no rain, no readings.
        assert_relative_eq!(state.smd_mm, 6.0, epsilon = 1e-9);
        assert_relative_eq!(state.cumulative_et_mm, 6.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rainfall_offsets_projection() {
        let mut t = tracker();
        let et = ReferenceEtEstimator::constant(6.0);

        t.update(&obs_bare(ts(1, 0)), &et).unwrap();
        let mut obs = obs_bare(ts(2, 0));
        obs.rainfall_mm = 4.0;
        let state = t.update(&obs, &et).unwrap();

        assert_relative_eq!(state.smd_mm, 2.0, epsilon = 1e-9);
        assert_relative_eq!(state.cumulative_rain_mm, 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_smd_clamped_to_zero_after_heavy_rain() {
        let mut t = tracker();
        let et = ReferenceEtEstimator::constant(6.0);

        t.update(&obs_bare(ts(1, 0)), &et).unwrap();
        let mut obs = obs_bare(ts(2, 0));
        obs.rainfall_mm = 50.0;
        let state = t.update(&obs, &et).unwrap();

        assert_eq!(state.smd_mm, 0.0);
    }

    #[test]
    fn test_smd_clamped_to_whc_under_extreme_drydown() {
        let mut t = tracker();
        let et = ReferenceEtEstimator::constant(25.0);

        t.update(&obs_bare(ts(1, 0)), &et).unwrap();
        // 30 days without rain or readings at 25 mm/day far exceeds WHC.
        let state = t.update(&obs_bare(ts(31, 0)), &et).unwrap();

        assert_relative_eq!(state.smd_mm, state.effective_whc_mm, epsilon = 1e-9);
    }

    #[test]
    fn test_sensor_readings_override_projection() {
        let mut t = tracker();
        // Projection alone would say 12 mm after two days.
        let et = ReferenceEtEstimator::constant(6.0);

        t.update(&obs_bare(ts(1, 0)), &et).unwrap();
        // Measured: 55% depletion, vwc = 0.33 - 0.55 * 0.20 = 0.22.
        let state = t.update(&obs_with_vwc(ts(3, 0), 0.22), &et).unwrap();

        assert_relative_eq!(state.depletion_fraction(), 0.55, epsilon = 1e-9);
        // Cumulative ET still tracks the estimate.
        assert_relative_eq!(state.cumulative_et_mm, 12.0, epsilon = 1e-9);
    }

    #[test]
    fn test_missing_depths_falls_back_to_projection() {
        let mut t = tracker();
        let et = ReferenceEtEstimator::constant(6.0);

        t.update(&obs_with_vwc(ts(1, 0), 0.33), &et).unwrap();
        // No readings at all: bucket projection, no failure.
        let state = t.update(&obs_bare(ts(2, 0)), &et).unwrap();
        assert_relative_eq!(state.smd_mm, 6.0, epsilon = 1e-9);
    }

    #[test]
    fn test_out_of_order_update_rejected_state_unchanged() {
        let mut t = tracker();
        let et = ReferenceEtEstimator::constant(6.0);

        t.update(&obs_bare(ts(2, 0)), &et).unwrap();
        let before = t.state().cloned();

        for bad in [ts(2, 0), ts(1, 12)] {
            let result = t.update(&obs_bare(bad), &et);
            assert!(matches!(result, Err(EngineError::TemporalOrder { .. })));
            assert_eq!(t.state().cloned(), before);
        }
    }

    #[test]
    fn test_negative_et_rate_rejected() {
        let mut t = tracker();
        let et = ReferenceEtEstimator::constant(-1.0);

        t.update(&obs_bare(ts(1, 0)), &et).unwrap();
        let result = t.update(&obs_bare(ts(2, 0)), &et);
        assert!(matches!(
            result,
            Err(EngineError::Computation(
                ComputationError::InvalidEtRate(_)
            ))
        ));
    }

    #[test]
    fn test_irrigation_resets_smd() {
        let mut t = tracker();
        let et = ReferenceEtEstimator::constant(10.0);

        t.update(&obs_bare(ts(1, 0)), &et).unwrap();
        t.update(&obs_bare(ts(5, 0)), &et).unwrap();
        assert!(t.state().unwrap().smd_mm > 0.0);

        t.record_irrigation(ts(5, 6)).unwrap();
        let state = t.state().unwrap();
        assert_eq!(state.smd_mm, 0.0);
        assert_eq!(state.cumulative_et_mm, 0.0);
        assert_eq!(state.cumulative_rain_mm, 0.0);
        assert_eq!(state.last_irrigation, Some(ts(5, 6)));
    }

    #[test]
    fn test_irrigation_before_first_observation() {
        let mut t = tracker();
        t.record_irrigation(ts(1, 0)).unwrap();

        let state = t.state().unwrap();
        assert_eq!(state.smd_mm, 0.0);
        assert_eq!(state.last_irrigation, Some(ts(1, 0)));
    }

    #[test]
    fn test_diurnal_estimator_preserves_daily_total() {
        let et = ReferenceEtEstimator::diurnal(7.0);
        let rate = et.estimate_et("z", ts(1, 0), ts(2, 0)).unwrap();
        assert_relative_eq!(rate, 7.0, epsilon = 1e-9);
    }

    #[test]
    fn test_diurnal_estimator_zero_at_night() {
        let et = ReferenceEtEstimator::diurnal(7.0);
        let rate = et
            .estimate_et("z", ts(1, 21), ts(1, 23))
            .unwrap();
        assert_relative_eq!(rate, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_diurnal_estimator_peaks_midday() {
        let et = ReferenceEtEstimator::diurnal(7.0);
        let midday = et.estimate_et("z", ts(1, 12), ts(1, 14)).unwrap();
        let morning = et.estimate_et("z", ts(1, 6), ts(1, 8)).unwrap();
        assert!(midday > morning);
    }

    #[test]
    fn test_estimator_rejects_empty_window() {
        let et = ReferenceEtEstimator::diurnal(7.0);
        assert!(et.estimate_et("z", ts(1, 12), ts(1, 12)).is_err());
    }
}
