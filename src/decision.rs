// FieldAlert - Irrigation decision engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Irrigation trigger decisions.
//!
//! [`evaluate`] is a pure function of the water balance, the stress index,
//! and the thresholds: same inputs, same record. That keeps the policy
//! trivially unit-testable and replayable against historical data. The
//! trigger is a logical OR of the two threshold conditions; the rationale
//! tag stays conjunctive (`BOTH`) for audit purposes, with neither threshold
//! taking precedence.

use crate::balance::WaterBalanceState;
use crate::config::TriggerThresholds;
use crate::cwsi::CwsiState;
use crate::error::{ComputationError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a decision triggered (or did not).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerRationale {
    /// SMD reached the management allowable depletion.
    SmdExceeded,
    /// CWSI reached its threshold.
    CwsiExceeded,
    /// Both thresholds exceeded simultaneously.
    Both,
    /// Neither threshold exceeded.
    None,
}

impl TriggerRationale {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerRationale::SmdExceeded => "SMD_EXCEEDED",
            TriggerRationale::CwsiExceeded => "CWSI_EXCEEDED",
            TriggerRationale::Both => "BOTH",
            TriggerRationale::None => "NONE",
        }
    }
}

/// One irrigation decision for one zone at one evaluation tick.
///
/// Immutable once produced; per zone these form an append-only ordered
/// sequence. The thresholds in force are captured so the decision can be
/// audited after configuration changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Zone the decision applies to.
    pub zone_id: String,

    /// Timestamp of the latest accepted observation the decision is based on.
    pub timestamp: DateTime<Utc>,

    /// Soil moisture deficit at evaluation (mm).
    pub smd_mm: f64,

    /// SMD as a fraction of effective WHC.
    pub smd_depletion: f64,

    /// Effective WHC backing the depletion fraction (mm).
    pub effective_whc_mm: f64,

    /// Crop water stress index at evaluation.
    pub cwsi: f64,

    /// Whether irrigation should be triggered.
    pub triggered: bool,

    /// Audit tag for the trigger.
    pub rationale: TriggerRationale,

    /// Thresholds the decision was evaluated against.
    pub thresholds: TriggerThresholds,
}

impl DecisionRecord {
    /// Serialize to JSON.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Evaluate the trigger policy for one zone.
pub fn evaluate(
    zone_id: &str,
    balance: &WaterBalanceState,
    cwsi: &CwsiState,
    thresholds: &TriggerThresholds,
) -> Result<DecisionRecord> {
    thresholds.validate()?;

    if !balance.effective_whc_mm.is_finite() || balance.effective_whc_mm <= 0.0 {
        return Err(ComputationError::InvalidEffectiveWhc(balance.effective_whc_mm).into());
    }

    let smd_depletion = balance.depletion_fraction();
    let smd_exceeded = smd_depletion >= thresholds.smd_depletion;
    let cwsi_exceeded = cwsi.index >= thresholds.cwsi;

    let rationale = match (smd_exceeded, cwsi_exceeded) {
        (true, true) => TriggerRationale::Both,
        (true, false) => TriggerRationale::SmdExceeded,
        (false, true) => TriggerRationale::CwsiExceeded,
        (false, false) => TriggerRationale::None,
    };

    Ok(DecisionRecord {
        zone_id: zone_id.to_string(),
        timestamp: balance.last_update,
        smd_mm: balance.smd_mm,
        smd_depletion,
        effective_whc_mm: balance.effective_whc_mm,
        cwsi: cwsi.index,
        triggered: rationale != TriggerRationale::None,
        rationale,
        thresholds: *thresholds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 10, 14, 0, 0).unwrap()
    }

    fn balance(smd_mm: f64) -> WaterBalanceState {
        WaterBalanceState {
            smd_mm,
            effective_whc_mm: 100.0,
            cumulative_et_mm: smd_mm,
            cumulative_rain_mm: 0.0,
            last_update: ts(),
            last_irrigation: None,
        }
    }

    fn cwsi(index: f64) -> CwsiState {
        CwsiState {
            index,
            delta_t_c: 1.0,
            lower_baseline_c: -0.5,
            upper_baseline_c: 4.6,
            vpd_kpa: 1.8,
            timestamp: ts(),
        }
    }

    #[test]
    fn test_no_trigger_below_thresholds() {
        let record = evaluate(
            "zone-a",
            &balance(20.0),
            &cwsi(0.2),
            &TriggerThresholds::default(),
        )
        .unwrap();

        assert!(!record.triggered);
        assert_eq!(record.rationale, TriggerRationale::None);
        assert_eq!(record.rationale.as_str(), "NONE");
    }

    #[test]
    fn test_smd_trigger() {
        // 55% depletion against a 50% threshold, CWSI quiet.
        let record = evaluate(
            "zone-a",
            &balance(55.0),
            &cwsi(0.2),
            &TriggerThresholds::default(),
        )
        .unwrap();

        assert!(record.triggered);
        assert_eq!(record.rationale, TriggerRationale::SmdExceeded);
        assert_eq!(record.smd_depletion, 0.55);
    }

    #[test]
    fn test_cwsi_trigger() {
        let record = evaluate(
            "zone-a",
            &balance(20.0),
            &cwsi(0.75),
            &TriggerThresholds::default(),
        )
        .unwrap();

        assert!(record.triggered);
        assert_eq!(record.rationale, TriggerRationale::CwsiExceeded);
    }

    #[test]
    fn test_both_trigger() {
        let record = evaluate(
            "zone-a",
            &balance(60.0),
            &cwsi(0.8),
            &TriggerThresholds::default(),
        )
        .unwrap();

        assert!(record.triggered);
        assert_eq!(record.rationale, TriggerRationale::Both);
        assert_eq!(record.rationale.as_str(), "BOTH");
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        let record = evaluate(
            "zone-a",
            &balance(50.0),
            &cwsi(0.6),
            &TriggerThresholds::default(),
        )
        .unwrap();

        assert_eq!(record.rationale, TriggerRationale::Both);
    }

    #[test]
    fn test_deterministic_for_same_inputs() {
        let b = balance(42.0);
        let c = cwsi(0.3);
        let t = TriggerThresholds::default();

        let first = evaluate("zone-a", &b, &c, &t).unwrap();
        let second = evaluate("zone-a", &b, &c, &t).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_thresholds_captured_in_record() {
        let t = TriggerThresholds {
            smd_depletion: 0.35,
            cwsi: 0.45,
        };
        let record = evaluate("zone-a", &balance(40.0), &cwsi(0.2), &t).unwrap();

        assert_eq!(record.thresholds, t);
        assert_eq!(record.rationale, TriggerRationale::SmdExceeded);
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let t = TriggerThresholds {
            smd_depletion: -0.1,
            cwsi: 0.6,
        };
        assert!(evaluate("zone-a", &balance(10.0), &cwsi(0.1), &t).is_err());
    }

    #[test]
    fn test_record_json_roundtrip() {
        let record = evaluate(
            "zone-a",
            &balance(55.0),
            &cwsi(0.7),
            &TriggerThresholds::default(),
        )
        .unwrap();

        let json = record.to_json().unwrap();
        let restored = DecisionRecord::from_json(&json).unwrap();
        assert_eq!(restored, record);

        let pretty = record.to_json_pretty().unwrap();
        assert!(pretty.contains('\n'));
    }
}
