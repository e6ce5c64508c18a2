// FieldAlert - Irrigation decision engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for FieldAlert
//!
//! This module defines all error types used throughout the library.

use crate::soil::Depth;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias for FieldAlert operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Main error type for FieldAlert operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed or out-of-range observation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Non-monotonic timestamp for a zone's ingest stream
    #[error("Temporal order error for zone '{zone}': {submitted} is not after last accepted {last}")]
    TemporalOrder {
        zone: String,
        last: DateTime<Utc>,
        submitted: DateTime<Utc>,
    },

    /// Missing or invalid static configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Degenerate numeric case in a single evaluation
    #[error("Computation error: {0}")]
    Computation(#[from] ComputationError),

    /// Zone not found
    #[error("Zone not found: {0}")]
    ZoneNotFound(String),

    /// Zone already registered
    #[error("Zone already registered: {0}")]
    ZoneAlreadyRegistered(String),

    /// Maximum zones reached
    #[error("Maximum zones ({max}) reached")]
    MaxZonesReached { max: usize },

    /// Zone has no accepted observations yet
    #[error("Zone '{0}' has no accepted observations")]
    ZoneNotReady(String),
}

/// Errors rejecting a raw observation during ingest.
///
/// A rejected observation never mutates zone state, so a corrected
/// resubmission with the same timestamp is still accepted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Zone identifier is empty
    #[error("Zone id is empty")]
    EmptyZoneId,

    /// Volumetric water content outside [0, 1]
    #[error("Volumetric water content at {depth} out of range: {value}")]
    MoistureOutOfRange { depth: Depth, value: f64 },

    /// Temperature outside the configured plausible range
    #[error("{field} temperature {value}\u{b0}C outside plausible range [{min}, {max}]")]
    TemperatureOutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Relative humidity outside [0, 100]
    #[error("Relative humidity out of range: {0}%")]
    HumidityOutOfRange(f64),

    /// Vapor pressure deficit must be non-negative
    #[error("Vapor pressure deficit out of range: {0} kPa")]
    VpdOutOfRange(f64),

    /// Rainfall must be non-negative
    #[error("Negative rainfall: {0} mm")]
    NegativeRainfall(f64),

    /// Value is not a valid number (NaN, Inf)
    #[error("Non-finite value in field '{0}'")]
    NonFinite(&'static str),
}

/// Errors in static per-session configuration.
///
/// Fatal for the affected zone's pipeline until corrected; thresholds are
/// never silently defaulted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Depth weights must sum to 1 within tolerance
    #[error("Depth weights sum to {sum}, expected 1.0 \u{b1} {tolerance}")]
    WeightSumInvalid { sum: f64, tolerance: f64 },

    /// Depth weights must be non-negative
    #[error("Negative weight {weight} at {depth}")]
    NegativeWeight { depth: Depth, weight: f64 },

    /// Field capacity must exceed wilting point at every depth
    #[error("Field capacity {fc} must exceed wilting point {pwp} at {depth}")]
    InvalidWhc { depth: Depth, fc: f64, pwp: f64 },

    /// Root zone depth must be positive
    #[error("Root depth must be positive: {0} mm")]
    InvalidRootDepth(f64),

    /// No present depth carries a nonzero weight
    #[error("No depth with nonzero weight among present readings")]
    NoWeightedDepth,

    /// No CWSI baseline configured for the zone's crop
    #[error("No CWSI baseline configured for crop '{0}'")]
    MissingCwsiBaseline(String),

    /// SMD trigger fraction outside (0, 1]
    #[error("SMD depletion threshold {0} outside (0, 1]")]
    InvalidSmdThreshold(f64),

    /// CWSI trigger threshold outside (0, 1]
    #[error("CWSI threshold {0} outside (0, 1]")]
    InvalidCwsiThreshold(f64),
}

/// Degenerate numeric cases rejecting a single evaluation.
///
/// Prior zone state remains valid after any of these.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComputationError {
    /// Upper and lower CWSI baselines coincide at the observed VPD
    #[error("CWSI baseline spread {spread}\u{b0}C at or below minimum {min}\u{b0}C at VPD {vpd} kPa")]
    DegenerateBaseline { spread: f64, min: f64, vpd: f64 },

    /// ET estimator returned a negative or non-finite rate
    #[error("ET estimator returned invalid rate: {0} mm/day")]
    InvalidEtRate(f64),

    /// ET estimator failed
    #[error("ET estimator failed: {0}")]
    EtEstimator(String),

    /// No vapor pressure deficit has been observed for the zone
    #[error("No CWSI computed yet for zone '{0}': no VPD or humidity observed")]
    CwsiUnavailable(String),

    /// Effective water holding capacity collapsed to zero
    #[error("Effective WHC is not positive: {0} mm")]
    InvalidEffectiveWhc(f64),
}
