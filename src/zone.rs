// FieldAlert - Irrigation decision engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Zone management.
//!
//! This module provides the [`ZoneManager`] and [`Zone`] types. Each zone
//! exclusively owns its water balance, CWSI state, last-accepted timestamp,
//! and decision history; zones share nothing, so callers may evaluate
//! different zones in parallel. Within a zone, observations apply in strict
//! timestamp order, and every application is atomic: candidate states are
//! fully computed before anything is committed.

use crate::balance::{EtEstimator, WaterBalanceState, WaterBalanceTracker};
use crate::config::{CwsiBaselines, TriggerThresholds, ZoneConfig};
use crate::cwsi::{CwsiCalculator, CwsiState};
use crate::decision::{self, DecisionRecord};
use crate::error::{ComputationError, EngineError, Result};
use crate::observation::Observation;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Unique identifier for a zone
pub type ZoneId = String;

/// A single irrigated zone with its own pipeline state
pub struct Zone {
    /// Zone identifier
    pub id: ZoneId,
    /// Zone configuration
    pub config: ZoneConfig,
    /// Water balance tracker
    tracker: WaterBalanceTracker,
    /// CWSI calculator for the zone's crop
    cwsi_calc: CwsiCalculator,
    /// Most recent computed stress index
    cwsi_state: Option<CwsiState>,
    /// Last accepted observation timestamp
    last_accepted: Option<DateTime<Utc>>,
    /// Latest accepted observation
    latest: Option<Observation>,
    /// Append-only decision history
    history: Vec<DecisionRecord>,
}

impl Zone {
    /// Create a new zone, validating its configuration against the engine's
    /// baseline table.
    pub fn new(
        id: impl Into<String>,
        config: ZoneConfig,
        baselines: &CwsiBaselines,
    ) -> Result<Self> {
        config.soil.validate()?;
        if let Some(thresholds) = &config.thresholds {
            thresholds.validate()?;
        }
        let cwsi_calc = CwsiCalculator::for_crop(baselines, &config.crop)?;

        let id = id.into();
        let tracker = WaterBalanceTracker::new(id.clone(), config.soil.clone());

        Ok(Self {
            id,
            config,
            tracker,
            cwsi_calc,
            cwsi_state: None,
            last_accepted: None,
            latest: None,
            history: Vec::new(),
        })
    }

    /// Last accepted observation timestamp.
    pub fn last_accepted(&self) -> Option<DateTime<Utc>> {
        self.last_accepted
    }

    /// Latest accepted observation.
    pub fn latest_observation(&self) -> Option<&Observation> {
        self.latest.as_ref()
    }

    /// Current water balance state.
    pub fn balance(&self) -> Option<&WaterBalanceState> {
        self.tracker.state()
    }

    /// Most recent CWSI state.
    pub fn cwsi_state(&self) -> Option<&CwsiState> {
        self.cwsi_state.as_ref()
    }

    /// Decision history, oldest first.
    pub fn history(&self) -> &[DecisionRecord] {
        &self.history
    }

    /// Most recent decision.
    pub fn last_decision(&self) -> Option<&DecisionRecord> {
        self.history.last()
    }

    /// Apply a validated observation to the zone's state.
    ///
    /// Both the water balance and the CWSI are computed before either is
    /// committed, so a failure partway leaves the zone exactly as it was.
    /// An observation without VPD keeps the previous CWSI state.
    pub fn apply(&mut self, obs: Observation, et: &dyn EtEstimator) -> Result<()> {
        let balance = self.tracker.project(&obs, et)?;
        let cwsi = match obs.vpd_kpa {
            Some(vpd) => Some(self.cwsi_calc.compute(
                obs.canopy_temp_c,
                obs.air_temp_c,
                vpd,
                obs.timestamp,
            )?),
            None => None,
        };

        self.tracker.commit(balance);
        if let Some(state) = cwsi {
            self.cwsi_state = Some(state);
        }
        self.last_accepted = Some(obs.timestamp);
        self.latest = Some(obs);
        Ok(())
    }

    /// Record that irrigation occurred, resetting SMD to field capacity.
    pub fn record_irrigation(&mut self, timestamp: DateTime<Utc>) -> Result<()> {
        self.tracker.record_irrigation(timestamp)
    }

    /// Evaluate the trigger policy against the zone's latest state and
    /// append the record to the zone's history.
    pub fn evaluate(&mut self, thresholds: &TriggerThresholds) -> Result<DecisionRecord> {
        let balance = self
            .tracker
            .state()
            .ok_or_else(|| EngineError::ZoneNotReady(self.id.clone()))?;
        let cwsi = self
            .cwsi_state
            .as_ref()
            .ok_or_else(|| ComputationError::CwsiUnavailable(self.id.clone()))?;

        let record = decision::evaluate(&self.id, balance, cwsi, thresholds)?;
        if record.triggered {
            log::info!(
                "zone '{}': irrigation trigger ({}) at SMD {:.1} mm ({:.0}% depletion), CWSI {:.2}",
                self.id,
                record.rationale.as_str(),
                record.smd_mm,
                record.smd_depletion * 100.0,
                record.cwsi
            );
        }
        self.history.push(record.clone());
        Ok(record)
    }
}

impl std::fmt::Debug for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Zone")
            .field("id", &self.id)
            .field("crop", &self.config.crop)
            .field("last_accepted", &self.last_accepted)
            .field("decisions", &self.history.len())
            .finish()
    }
}

/// Manages multiple zones
pub struct ZoneManager {
    /// Map of zone ID to zone
    zones: HashMap<ZoneId, Zone>,
    /// Maximum number of zones allowed
    max_zones: usize,
}

impl ZoneManager {
    /// Create a new zone manager with the specified maximum zones
    pub fn new(max_zones: usize) -> Self {
        Self {
            zones: HashMap::new(),
            max_zones,
        }
    }

    /// Register a zone
    pub fn register(&mut self, zone: Zone) -> Result<()> {
        if self.zones.contains_key(&zone.id) {
            return Err(EngineError::ZoneAlreadyRegistered(zone.id));
        }

        if self.zones.len() >= self.max_zones {
            return Err(EngineError::MaxZonesReached {
                max: self.max_zones,
            });
        }

        log::debug!("zone '{}' registered ({})", zone.id, zone.config.crop);
        self.zones.insert(zone.id.clone(), zone);
        Ok(())
    }

    /// Remove a zone
    pub fn remove(&mut self, id: &str) -> Result<Zone> {
        self.zones
            .remove(id)
            .ok_or_else(|| EngineError::ZoneNotFound(id.to_string()))
    }

    /// Get a reference to a zone
    pub fn get(&self, id: &str) -> Result<&Zone> {
        self.zones
            .get(id)
            .ok_or_else(|| EngineError::ZoneNotFound(id.to_string()))
    }

    /// Get a mutable reference to a zone
    pub fn get_mut(&mut self, id: &str) -> Result<&mut Zone> {
        self.zones
            .get_mut(id)
            .ok_or_else(|| EngineError::ZoneNotFound(id.to_string()))
    }

    /// Check if a zone exists
    pub fn contains(&self, id: &str) -> bool {
        self.zones.contains_key(id)
    }

    /// Get an iterator over zone IDs
    pub fn list(&self) -> impl Iterator<Item = &ZoneId> {
        self.zones.keys()
    }

    /// Get an iterator over zones
    pub fn iter(&self) -> impl Iterator<Item = (&ZoneId, &Zone)> {
        self.zones.iter()
    }

    /// Get the number of zones
    pub fn count(&self) -> usize {
        self.zones.len()
    }

    /// Check if there are no zones
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Total decisions recorded across all zones
    pub fn total_decisions(&self) -> usize {
        self.zones.values().map(|z| z.history().len()).sum()
    }
}

impl Default for ZoneManager {
    fn default() -> Self {
        Self::new(64)
    }
}
