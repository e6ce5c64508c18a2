// FieldAlert - Irrigation decision engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! FieldAlertEngine - main orchestration for irrigation decisions.
//!
//! The engine owns the ingest validator, the per-zone pipelines, and the
//! injected ET estimator, and exposes the external interface: `ingest`,
//! `record_irrigation_event`, `evaluate`, and `history`. It performs no
//! network or disk I/O; weather data, persistence, and alert delivery are
//! collaborator concerns handed across as already-materialized values.

use crate::alert::AlertSink;
use crate::balance::{EtEstimator, WaterBalanceState};
use crate::config::{EngineConfig, ZoneConfig};
use crate::cwsi::CwsiState;
use crate::decision::DecisionRecord;
use crate::error::Result;
use crate::observation::{Observation, ObservationIngest, RawObservation};
use crate::zone::{Zone, ZoneId, ZoneManager};
use chrono::{DateTime, Utc};

/// Outcome of a batch ingest.
///
/// A batch stops at the first failure; records before it remain applied,
/// and every zone's state stays internally consistent because individual
/// applications are atomic.
#[derive(Debug)]
pub struct BatchReport {
    /// Records accepted before the batch stopped.
    pub accepted: usize,
    /// The failure that stopped the batch, if any.
    pub failure: Option<BatchFailure>,
}

/// A failed record within a batch.
#[derive(Debug)]
pub struct BatchFailure {
    /// Index of the failing record in the submitted slice.
    pub index: usize,
    /// The rejection.
    pub error: crate::error::EngineError,
}

impl BatchReport {
    /// Whether every record in the batch was accepted.
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// Main engine orchestrating ingest, per-zone state, and decisions.
pub struct FieldAlertEngine {
    config: EngineConfig,
    ingest: ObservationIngest,
    zones: ZoneManager,
    et: Box<dyn EtEstimator>,
}

impl FieldAlertEngine {
    /// Create a new engine with the given configuration and ET estimator.
    pub fn new(config: EngineConfig, et: Box<dyn EtEstimator>) -> Result<Self> {
        config.thresholds.validate()?;
        Ok(Self {
            ingest: ObservationIngest::new(config.ingest.clone()),
            zones: ZoneManager::new(config.max_zones),
            config,
            et,
        })
    }

    /// Register a zone. Fails if the id is taken, the zone limit is
    /// reached, or the configuration is invalid.
    pub fn register_zone(&mut self, id: impl Into<String>, config: ZoneConfig) -> Result<()> {
        let zone = Zone::new(id, config, &self.config.baselines)?;
        self.zones.register(zone)
    }

    /// Remove a zone, returning it with its state and history.
    ///
    /// Re-registering the same id afterwards starts from fresh state; this
    /// is the configuration-reload path.
    pub fn remove_zone(&mut self, id: &str) -> Result<Zone> {
        self.zones.remove(id)
    }

    /// Validate, normalize, and apply one raw observation to its zone.
    ///
    /// Returns the normalized observation. On any error the zone's state is
    /// untouched and its last-accepted timestamp does not advance, so a
    /// corrected resubmission is still accepted.
    pub fn ingest(&mut self, raw: &RawObservation) -> Result<Observation> {
        let zone = self.zones.get_mut(&raw.zone_id)?;
        let obs = self.ingest.normalize(raw, zone.last_accepted())?;
        zone.apply(obs.clone(), self.et.as_ref())?;
        log::debug!(
            "zone '{}': observation accepted at {}",
            obs.zone_id,
            obs.timestamp
        );
        Ok(obs)
    }

    /// Apply a batch of raw observations, stopping at the first failure.
    pub fn ingest_batch(&mut self, raws: &[RawObservation]) -> BatchReport {
        for (index, raw) in raws.iter().enumerate() {
            if let Err(error) = self.ingest(raw) {
                log::warn!(
                    "batch ingest stopped at record {index} for zone '{}': {error}",
                    raw.zone_id
                );
                return BatchReport {
                    accepted: index,
                    failure: Some(BatchFailure { index, error }),
                };
            }
        }
        BatchReport {
            accepted: raws.len(),
            failure: None,
        }
    }

    /// Inform the tracker that irrigation occurred, resetting the zone's
    /// SMD to field capacity.
    pub fn record_irrigation_event(
        &mut self,
        zone_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        self.zones.get_mut(zone_id)?.record_irrigation(timestamp)
    }

    /// Run the decision policy for a zone's latest accepted observation and
    /// append the record to the zone's history.
    pub fn evaluate(&mut self, zone_id: &str) -> Result<DecisionRecord> {
        let zone = self.zones.get_mut(zone_id)?;
        let thresholds = zone.config.thresholds.unwrap_or(self.config.thresholds);
        zone.evaluate(&thresholds)
    }

    /// Evaluate and hand the record to an alert sink.
    pub fn evaluate_into(
        &mut self,
        zone_id: &str,
        sink: &mut dyn AlertSink,
    ) -> Result<DecisionRecord> {
        let record = self.evaluate(zone_id)?;
        sink.dispatch(&record);
        Ok(record)
    }

    /// Read-only decision history for a zone, oldest first.
    pub fn history(&self, zone_id: &str) -> Result<&[DecisionRecord]> {
        Ok(self.zones.get(zone_id)?.history())
    }

    /// Most recent decision for a zone, if any.
    pub fn last_decision(&self, zone_id: &str) -> Result<Option<&DecisionRecord>> {
        Ok(self.zones.get(zone_id)?.last_decision())
    }

    /// Current water balance state for a zone, if any observation has been
    /// applied.
    pub fn balance(&self, zone_id: &str) -> Result<Option<&WaterBalanceState>> {
        Ok(self.zones.get(zone_id)?.balance())
    }

    /// Most recent CWSI state for a zone.
    pub fn cwsi(&self, zone_id: &str) -> Result<Option<&CwsiState>> {
        Ok(self.zones.get(zone_id)?.cwsi_state())
    }

    /// Latest accepted observation for a zone.
    pub fn latest_observation(&self, zone_id: &str) -> Result<Option<&Observation>> {
        Ok(self.zones.get(zone_id)?.latest_observation())
    }

    /// Check if a zone is registered.
    pub fn contains_zone(&self, zone_id: &str) -> bool {
        self.zones.contains(zone_id)
    }

    /// Number of registered zones.
    pub fn zone_count(&self) -> usize {
        self.zones.count()
    }

    /// Iterator over registered zone ids.
    pub fn zone_ids(&self) -> impl Iterator<Item = &ZoneId> {
        self.zones.list()
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
