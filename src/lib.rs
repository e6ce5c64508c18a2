// FieldAlert - Irrigation decision engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # FieldAlert
//!
//! Irrigation decision engine for multi-depth soil moisture and canopy
//! temperature telemetry.
//!
//! FieldAlert ingests time-stamped observations, maintains a running soil
//! water balance per zone, computes a Crop Water Stress Index (CWSI), and
//! emits trigger decisions with explainable thresholds:
//! - **Water balance**: lumped-bucket soil moisture deficit (SMD), updated
//!   by estimated ET and rainfall, reconciled against sensed moisture
//! - **CWSI**: Idso two-line canopy stress model, clamped to [0, 1]
//! - **Decisions**: pure threshold policy with audit tags and captured
//!   threshold values
//! - **Zones**: isolated per-zone pipelines composed in a zone map
//!
//! ## Quick Start
//!
//! ```rust
//! use fieldalert::{EngineConfig, FieldAlertEngine, RawObservation, ZoneConfig};
//! use fieldalert::balance::ReferenceEtEstimator;
//! use fieldalert::soil::{Depth, SoilProfile, TextureClass};
//! use chrono::{TimeZone, Utc};
//!
//! // An engine with default thresholds (50% depletion, CWSI 0.6) and a
//! // flat reference ET estimator.
//! let mut engine = FieldAlertEngine::new(
//!     EngineConfig::default(),
//!     Box::new(ReferenceEtEstimator::constant(6.5)),
//! )
//! .unwrap();
//!
//! engine
//!     .register_zone(
//!         "north-40",
//!         ZoneConfig::new(SoilProfile::from_texture(TextureClass::SiltLoam), "corn"),
//!     )
//!     .unwrap();
//!
//! // One observation: probes, canopy/air temperatures, humidity.
//! let t0 = Utc.with_ymd_and_hms(2025, 7, 1, 6, 0, 0).unwrap();
//! let raw = RawObservation::new("north-40", t0, 24.5, 23.0)
//!     .with_depth(Depth::Six, 0.27)
//!     .with_depth(Depth::Twelve, 0.29)
//!     .with_relative_humidity(45.0);
//! engine.ingest(&raw).unwrap();
//!
//! let decision = engine.evaluate("north-40").unwrap();
//! assert!(!decision.triggered);
//! assert_eq!(decision.rationale.as_str(), "NONE");
//! ```
//!
//! ## Key Concepts
//!
//! ### Soil moisture deficit
//!
//! Each zone carries a bucket: `SMD' = clamp(SMD + ET − rain − measured
//! delta, 0, WHC)`. Direct sensor readings are ground truth — when depth
//! readings are present the deficit reconciles to them, and the ET/rain
//! projection only bridges the gaps between readings. An explicit
//! irrigation event returns the bucket to field capacity.
//!
//! ### CWSI
//!
//! The observed canopy-minus-air differential is positioned between a
//! non-water-stressed lower baseline (linear in VPD) and a non-transpiring
//! upper baseline, per crop. 0 means no stress, 1 maximum stress. VPD is
//! derived from relative humidity when not supplied.
//!
//! ### Decisions
//!
//! The trigger policy is a pure function: SMD depletion and CWSI against
//! their thresholds, OR'd for the trigger, with a conjunctive `BOTH` tag
//! when both fire. Records capture the thresholds in force, append per zone,
//! and replay identically for backtesting.
//!
//! ### Errors
//!
//! Rejected observations never touch zone state — a zone's last-accepted
//! timestamp only advances on success, so corrected resubmissions are
//! always possible. Missing configuration fails loudly; safety-critical
//! thresholds are never silently defaulted.
//!
//! ## Concurrency
//!
//! Zones share no mutable state. The engine itself is single-writer; to
//! parallelize, shard zones across engines or wrap per-zone pipelines in
//! your own executor. Nothing in the core blocks on I/O.

// Core modules
pub mod alert;
pub mod balance;
pub mod config;
pub mod cwsi;
pub mod decision;
pub mod engine;
pub mod error;
pub mod observation;
pub mod soil;
pub mod zone;

// Re-exports for convenience
pub use alert::{AlertSink, VecSink};
pub use balance::{EtEstimator, ReferenceEtEstimator, WaterBalanceState, WaterBalanceTracker};
pub use config::{
    CwsiBaseline, CwsiBaselines, EngineConfig, IngestConfig, TriggerThresholds, ZoneConfig,
};
pub use cwsi::{CwsiCalculator, CwsiState};
pub use decision::{DecisionRecord, TriggerRationale};
pub use engine::{BatchFailure, BatchReport, FieldAlertEngine};
pub use error::{ComputationError, ConfigError, EngineError, Result, ValidationError};
pub use observation::{Observation, ObservationIngest, RawObservation};
pub use soil::{Depth, DepthWhc, SoilProfile, TextureClass};
pub use zone::{Zone, ZoneId, ZoneManager};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
