// FieldAlert - Irrigation decision engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Soil profile configuration: texture classes, per-depth water holding
//! capacity, and depth weighting.
//!
//! A [`SoilProfile`] is static per-zone configuration, immutable after load.
//! It aggregates per-depth sensor readings into a profile-wide estimate and
//! converts volumetric water content into millimeters of water over the
//! effective root zone.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Tolerance for the depth-weight sum invariant (1.0 ± this).
pub const WEIGHT_TOLERANCE: f64 = 1e-3;

/// Default effective root zone depth: 36 inches in millimeters.
pub const DEFAULT_ROOT_DEPTH_MM: f64 = 914.4;

/// Monitored sensor depth.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Depth {
    /// 6 inch probe
    #[serde(rename = "6in")]
    Six,
    /// 12 inch probe
    #[serde(rename = "12in")]
    Twelve,
    /// 18 inch probe
    #[serde(rename = "18in")]
    Eighteen,
}

impl Depth {
    /// All monitored depths, shallow to deep.
    pub const ALL: [Depth; 3] = [Depth::Six, Depth::Twelve, Depth::Eighteen];

    /// Probe depth in inches.
    pub fn inches(&self) -> u32 {
        match self {
            Depth::Six => 6,
            Depth::Twelve => 12,
            Depth::Eighteen => 18,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Depth::Six => "6in",
            Depth::Twelve => "12in",
            Depth::Eighteen => "18in",
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// USDA soil texture class.
///
/// Field capacity and wilting point defaults are USDA NRCS Soil Survey
/// typical values in cm³/cm³.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureClass {
    Sand,
    LoamySand,
    SandyLoam,
    Loam,
    SiltLoam,
    SandyClayLoam,
    ClayLoam,
    SiltyClayLoam,
    Clay,
}

impl TextureClass {
    /// Field capacity (volumetric water content, cm³/cm³).
    pub fn field_capacity(&self) -> f64 {
        match self {
            TextureClass::Sand => 0.12,
            TextureClass::LoamySand => 0.14,
            TextureClass::SandyLoam => 0.23,
            TextureClass::Loam => 0.27,
            TextureClass::SiltLoam => 0.33,
            TextureClass::SandyClayLoam => 0.26,
            TextureClass::ClayLoam => 0.32,
            TextureClass::SiltyClayLoam => 0.37,
            TextureClass::Clay => 0.43,
        }
    }

    /// Permanent wilting point (cm³/cm³).
    pub fn wilting_point(&self) -> f64 {
        match self {
            TextureClass::Sand => 0.04,
            TextureClass::LoamySand => 0.06,
            TextureClass::SandyLoam => 0.10,
            TextureClass::Loam => 0.12,
            TextureClass::SiltLoam => 0.13,
            TextureClass::SandyClayLoam => 0.15,
            TextureClass::ClayLoam => 0.20,
            TextureClass::SiltyClayLoam => 0.22,
            TextureClass::Clay => 0.29,
        }
    }

    /// Total available water: field capacity minus wilting point.
    pub fn available_water(&self) -> f64 {
        self.field_capacity() - self.wilting_point()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TextureClass::Sand => "Sand",
            TextureClass::LoamySand => "Loamy Sand",
            TextureClass::SandyLoam => "Sandy Loam",
            TextureClass::Loam => "Loam",
            TextureClass::SiltLoam => "Silt Loam",
            TextureClass::SandyClayLoam => "Sandy Clay Loam",
            TextureClass::ClayLoam => "Clay Loam",
            TextureClass::SiltyClayLoam => "Silty Clay Loam",
            TextureClass::Clay => "Clay",
        }
    }
}

impl fmt::Display for TextureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Water holding capacity bounds for a single depth (cm³/cm³).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthWhc {
    /// Field capacity
    pub field_capacity: f64,
    /// Permanent wilting point
    pub wilting_point: f64,
}

impl DepthWhc {
    pub fn new(field_capacity: f64, wilting_point: f64) -> Self {
        Self {
            field_capacity,
            wilting_point,
        }
    }

    /// Available water fraction at this depth.
    pub fn available_water(&self) -> f64 {
        self.field_capacity - self.wilting_point
    }

    fn validate(&self, depth: Depth) -> Result<(), ConfigError> {
        if self.field_capacity <= self.wilting_point {
            return Err(ConfigError::InvalidWhc {
                depth,
                fc: self.field_capacity,
                pwp: self.wilting_point,
            });
        }
        Ok(())
    }
}

/// Static soil configuration for one zone.
///
/// Depth weights sum to 1.0 ± [`WEIGHT_TOLERANCE`] and are renormalized over
/// whichever depths are present in a given observation, so partial depth sets
/// are tolerated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilProfile {
    /// Texture class this profile was derived from.
    pub texture: TextureClass,
    /// Per-depth water holding capacity bounds.
    whc: BTreeMap<Depth, DepthWhc>,
    /// Per-depth aggregation weights.
    weights: BTreeMap<Depth, f64>,
    /// Effective root zone depth in millimeters.
    pub root_depth_mm: f64,
}

impl SoilProfile {
    /// Build a profile from a texture class: uniform WHC across the three
    /// monitored depths, default weights biased toward the shallow probes
    /// where root density is highest.
    pub fn from_texture(texture: TextureClass) -> Self {
        let whc = Depth::ALL
            .iter()
            .map(|&d| {
                (
                    d,
                    DepthWhc::new(texture.field_capacity(), texture.wilting_point()),
                )
            })
            .collect();
        let weights = [
            (Depth::Six, 0.40),
            (Depth::Twelve, 0.35),
            (Depth::Eighteen, 0.25),
        ]
        .into_iter()
        .collect();

        Self {
            texture,
            whc,
            weights,
            root_depth_mm: DEFAULT_ROOT_DEPTH_MM,
        }
    }

    /// Build a profile from explicit per-depth values. Validates invariants.
    pub fn new(
        texture: TextureClass,
        whc: BTreeMap<Depth, DepthWhc>,
        weights: BTreeMap<Depth, f64>,
        root_depth_mm: f64,
    ) -> Result<Self, ConfigError> {
        let profile = Self {
            texture,
            whc,
            weights,
            root_depth_mm,
        };
        profile.validate()?;
        Ok(profile)
    }

    /// Replace the aggregation weights. Validates the result.
    pub fn with_weights(mut self, weights: BTreeMap<Depth, f64>) -> Result<Self, ConfigError> {
        self.weights = weights;
        self.validate()?;
        Ok(self)
    }

    /// WHC bounds for a depth, if configured.
    pub fn whc(&self, depth: Depth) -> Option<&DepthWhc> {
        self.whc.get(&depth)
    }

    /// Aggregation weight for a depth (0 if unconfigured).
    pub fn weight(&self, depth: Depth) -> f64 {
        self.weights.get(&depth).copied().unwrap_or(0.0)
    }

    /// Check all profile invariants: fc > pwp per depth, weights ≥ 0 summing
    /// to 1 ± tolerance, positive root depth.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.root_depth_mm.is_finite() || self.root_depth_mm <= 0.0 {
            return Err(ConfigError::InvalidRootDepth(self.root_depth_mm));
        }

        for (&depth, whc) in &self.whc {
            whc.validate(depth)?;
        }

        let mut sum = 0.0;
        for (&depth, &weight) in &self.weights {
            if weight < 0.0 {
                return Err(ConfigError::NegativeWeight { depth, weight });
            }
            sum += weight;
        }
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ConfigError::WeightSumInvalid {
                sum,
                tolerance: WEIGHT_TOLERANCE,
            });
        }

        Ok(())
    }

    /// Effective water holding capacity in millimeters over the root zone,
    /// aggregated with weights renormalized over the present depths.
    pub fn effective_whc(&self, present: &[Depth]) -> Result<f64, ConfigError> {
        self.validate()?;

        let mut weight_sum = 0.0;
        let mut weighted_aw = 0.0;
        for &depth in present {
            if let Some(whc) = self.whc.get(&depth) {
                let w = self.weight(depth);
                weight_sum += w;
                weighted_aw += w * whc.available_water();
            }
        }
        if weight_sum <= 0.0 {
            return Err(ConfigError::NoWeightedDepth);
        }

        Ok(weighted_aw / weight_sum * self.root_depth_mm)
    }

    /// Profile-wide volumetric water content from per-depth readings,
    /// weights renormalized over the depths present.
    pub fn weighted_vwc(&self, readings: &BTreeMap<Depth, f64>) -> Result<f64, ConfigError> {
        let mut weight_sum = 0.0;
        let mut weighted = 0.0;
        for (&depth, &vwc) in readings {
            if self.whc.contains_key(&depth) {
                let w = self.weight(depth);
                weight_sum += w;
                weighted += w * vwc;
            }
        }
        if weight_sum <= 0.0 {
            return Err(ConfigError::NoWeightedDepth);
        }
        Ok(weighted / weight_sum)
    }

    /// Sensor-derived soil moisture deficit in millimeters: field capacity
    /// minus measured content, over the root zone, floored at zero.
    pub fn deficit_mm(&self, readings: &BTreeMap<Depth, f64>) -> Result<f64, ConfigError> {
        let mut weight_sum = 0.0;
        let mut weighted_fc = 0.0;
        for (&depth, _) in readings {
            if let Some(whc) = self.whc.get(&depth) {
                let w = self.weight(depth);
                weight_sum += w;
                weighted_fc += w * whc.field_capacity;
            }
        }
        if weight_sum <= 0.0 {
            return Err(ConfigError::NoWeightedDepth);
        }
        let fc = weighted_fc / weight_sum;
        let vwc = self.weighted_vwc(readings)?;

        Ok(((fc - vwc) * self.root_depth_mm).max(0.0))
    }
}
