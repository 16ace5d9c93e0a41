//! Tunable constants for placement validation.
//!
//! Every threshold the rule catalog and the cluster aggregator read lives in
//! [`PlacementConfig`], so an event can swap them at startup (or mid-session)
//! without recompiling. Distances and areas are planar metres / square metres.

use std::fmt;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Fire-safety distance every placement keeps from its neighbours.
pub const DEFAULT_FIRE_BUFFER_M: f64 = 5.0;
/// Extra padding on bounding boxes so the buffer's arc approximation never
/// makes the box test reject a pair the exact test would accept.
pub const DEFAULT_BBOX_EPSILON_M: f64 = 0.5;
/// Largest combined footprint one fire-safety cluster may cover.
pub const DEFAULT_MAX_CLUSTER_SQM: f64 = 1500.0;
/// Power need (watts) above which the placement is flagged for a typo check.
pub const DEFAULT_MAX_POWER_NEED: f64 = 7000.0;
/// Vertex count above which a shape is considered hard to stake out in reality.
pub const DEFAULT_MAX_POINTS_BEFORE_WARNING: usize = 8;
/// Freshly drawn polygons larger than this are rejected outright.
pub const DEFAULT_MAX_DRAWN_AREA_SQM: f64 = 1000.0;
pub const DEFAULT_SQM_PER_PERSON: f64 = 10.0;
pub const DEFAULT_SQM_PER_VEHICLE: f64 = 70.0;

/// Settings consumed by the rule catalog and the cluster aggregator.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub fire_buffer_m: f64,
    pub bbox_epsilon_m: f64,
    pub max_cluster_sqm: f64,
    pub max_power_need: f64,
    pub max_points_before_warning: usize,
    pub max_drawn_area_sqm: f64,
    pub sqm_per_person: f64,
    pub sqm_per_vehicle: f64,
    /// Initial slack of the "reasonable area" curve (fraction of the need).
    pub allowed_area_a: f64,
    /// Decay exponent of the "reasonable area" curve.
    pub allowed_area_b: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            fire_buffer_m: DEFAULT_FIRE_BUFFER_M,
            bbox_epsilon_m: DEFAULT_BBOX_EPSILON_M,
            max_cluster_sqm: DEFAULT_MAX_CLUSTER_SQM,
            max_power_need: DEFAULT_MAX_POWER_NEED,
            max_points_before_warning: DEFAULT_MAX_POINTS_BEFORE_WARNING,
            max_drawn_area_sqm: DEFAULT_MAX_DRAWN_AREA_SQM,
            sqm_per_person: DEFAULT_SQM_PER_PERSON,
            sqm_per_vehicle: DEFAULT_SQM_PER_VEHICLE,
            allowed_area_a: 0.5,
            allowed_area_b: -0.2,
        }
    }
}

impl PlacementConfig {
    /// Parse a config from JSON. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config from JSON, logging a warning and returning `Default` on failure.
    pub fn from_json_or_default(json: &str) -> Self {
        match Self::from_json(json) {
            Ok(config) => config,
            Err(e) => {
                warn!("PlacementConfig: {}, falling back to defaults", e);
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let distances = [
            ("fire_buffer_m", self.fire_buffer_m),
            ("bbox_epsilon_m", self.bbox_epsilon_m),
            ("max_cluster_sqm", self.max_cluster_sqm),
            ("max_power_need", self.max_power_need),
            ("max_drawn_area_sqm", self.max_drawn_area_sqm),
            ("sqm_per_person", self.sqm_per_person),
            ("sqm_per_vehicle", self.sqm_per_vehicle),
        ];
        for (field, value) in distances {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::OutOfRange { field, value });
            }
        }
        if !self.allowed_area_a.is_finite() || !self.allowed_area_b.is_finite() {
            return Err(ConfigError::OutOfRange {
                field: "allowed_area",
                value: self.allowed_area_a,
            });
        }
        Ok(())
    }

    /// Upper bound of a "reasonable" area for the given calculated need.
    ///
    /// The slack starts at `allowed_area_a` of the need and shrinks as the need
    /// grows (`a * need^b`, clamped to `[0, a]`), and never exceeds the cluster cap.
    pub fn reasonable_allowed_area(&self, calculated_need: f64) -> f64 {
        let a = self.allowed_area_a;
        let slack = (a * calculated_need.powf(self.allowed_area_b)).clamp(0.0, a.max(0.0));
        (calculated_need * (1.0 + slack)).min(self.max_cluster_sqm)
    }
}

/// Errors raised while loading a [`PlacementConfig`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The JSON could not be parsed into a config.
    Parse(String),
    /// A numeric field is negative, NaN or infinite.
    OutOfRange { field: &'static str, value: f64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "Config parse error: {msg}"),
            ConfigError::OutOfRange { field, value } => {
                write!(f, "Config field {field} out of range: {value}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
