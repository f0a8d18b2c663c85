//! Zone and intensity classification of detected strikes.
//!
//! Zones are checked in declared order and the first rectangle containing
//! the peak wins, so overlapping or gappy layouts resolve by order, not by
//! geometry. Peaks at or below the z gate are not strikes at all.

use crate::config::ConfigError;
use crate::core::peaks::Peak;
use crate::source::types::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A named rectangle in the x/y plane. Bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneBoundary {
    pub name: String,
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl ZoneBoundary {
    pub fn new(name: impl Into<String>, x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            name: name.into(),
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Check whether an x/y position falls inside this rectangle.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        (self.x_min..=self.x_max).contains(&x) && (self.y_min..=self.y_max).contains(&y)
    }
}

/// Ordered zone rectangles plus the shared height gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneLayout {
    /// Peaks with `z` at or below this are rejected outright
    pub z_gate_threshold: f64,
    /// Rectangles in evaluation order
    pub boundaries: Vec<ZoneBoundary>,
}

impl Default for ZoneLayout {
    fn default() -> Self {
        Self::dual_device()
    }
}

impl ZoneLayout {
    /// Layout used when each hand carries its own sensor.
    pub fn dual_device() -> Self {
        Self {
            z_gate_threshold: -5.0,
            boundaries: vec![
                ZoneBoundary::new("hitoms", -4.5, 0.0, -1.5, 1.0),
                ZoneBoundary::new("hihats", -1.5, 0.0, 1.5, 1.0),
                ZoneBoundary::new("lotoms", 1.5, 0.0, 4.5, 1.0),
                ZoneBoundary::new("ride", -4.5, -1.0, -1.5, 0.0),
                ZoneBoundary::new("snare", -1.5, -1.0, 1.5, 0.0),
                ZoneBoundary::new("crash", 1.5, -1.0, 4.5, 0.0),
            ],
        }
    }

    /// Layout used with a single sensor.
    pub fn single_device() -> Self {
        Self {
            z_gate_threshold: -5.0,
            boundaries: vec![
                ZoneBoundary::new("hihats", -0.5, -0.5, 0.0, 0.0),
                ZoneBoundary::new("crash", -0.5, 0.0, 0.0, 0.5),
                ZoneBoundary::new("hitoms", 0.0, 0.0, 0.5, 0.5),
                ZoneBoundary::new("lotoms", 0.0, -0.5, 0.5, 0.0),
                ZoneBoundary::new("ride", 0.5, -10.0, 10.0, 10.0),
                ZoneBoundary::new("snare", -10.0, -10.0, -0.5, 10.0),
            ],
        }
    }

    /// Resolve a position to the first matching zone.
    pub fn zone_for(&self, position: &Vec3) -> Option<&ZoneBoundary> {
        let [x, y, z] = *position;
        if z <= self.z_gate_threshold {
            return None;
        }
        self.boundaries.iter().find(|b| b.contains(x, y))
    }

    /// Reject layouts that can never classify correctly.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.z_gate_threshold.is_finite() {
            return Err(ConfigError::Invalid(
                "z_gate_threshold must be finite".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for zone in &self.boundaries {
            if zone.name.trim().is_empty() {
                return Err(ConfigError::Invalid("zone name is empty".to_string()));
            }
            if zone.name.contains(['/', '\\']) || zone.name == "." || zone.name == ".." {
                return Err(ConfigError::Invalid(format!(
                    "zone name {:?} cannot be used as an asset directory",
                    zone.name
                )));
            }
            if !seen.insert(zone.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "zone {:?} is declared twice",
                    zone.name
                )));
            }
            let bounds = [zone.x_min, zone.y_min, zone.x_max, zone.y_max];
            if bounds.iter().any(|b| b.is_nan()) {
                return Err(ConfigError::Invalid(format!(
                    "zone {:?} has a NaN bound",
                    zone.name
                )));
            }
            if zone.x_min > zone.x_max || zone.y_min > zone.y_max {
                return Err(ConfigError::Invalid(format!(
                    "zone {:?} has inverted bounds",
                    zone.name
                )));
            }
        }
        Ok(())
    }
}

/// Ascending intensity thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelTable(Vec<f64>);

impl Default for LevelTable {
    fn default() -> Self {
        Self(vec![6.0, 8.0, 12.0, 16.0, 20.0, 24.0, 28.0, 32.0, 36.0])
    }
}

impl LevelTable {
    /// Build a table, rejecting thresholds that are not strictly ascending.
    pub fn new(thresholds: Vec<f64>) -> Result<Self, ConfigError> {
        let table = Self(thresholds);
        table.validate()?;
        Ok(table)
    }

    /// Thresholds for the single-sensor layout.
    pub fn single_device() -> Self {
        Self(vec![8.0, 11.0, 13.5, 14.0, 16.5, 17.0, 18.5, 20.0])
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.0
    }

    /// Number of distinct levels (one more than the threshold count).
    pub fn level_count(&self) -> usize {
        self.0.len() + 1
    }

    /// Quantize an intensity.
    ///
    /// Returns the index of the first threshold strictly above `|intensity|`,
    /// or the table length when every threshold is exceeded.
    pub fn level(&self, intensity: f64) -> usize {
        let value = intensity.abs();
        self.0
            .iter()
            .position(|&threshold| threshold > value)
            .unwrap_or(self.0.len())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.0.iter().any(|t| !t.is_finite()) {
            return Err(ConfigError::Invalid(
                "level thresholds must be finite".to_string(),
            ));
        }
        if self.0.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(ConfigError::Invalid(format!(
                "level thresholds must be strictly ascending: {:?}",
                self.0
            )));
        }
        Ok(())
    }
}

/// Result of classifying one peak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Matched zone, `None` when gated out or outside every rectangle
    pub zone: Option<String>,
    /// Intensity level, present only when a zone matched
    pub level: Option<usize>,
}

impl Classification {
    pub fn is_strike(&self) -> bool {
        self.zone.is_some()
    }
}

/// Zone layout and level table applied together.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    layout: ZoneLayout,
    levels: LevelTable,
}

impl Classifier {
    pub fn new(layout: ZoneLayout, levels: LevelTable) -> Self {
        Self { layout, levels }
    }

    pub fn layout(&self) -> &ZoneLayout {
        &self.layout
    }

    pub fn levels(&self) -> &LevelTable {
        &self.levels
    }

    pub fn classify(&self, peak: &Peak) -> Classification {
        match self.layout.zone_for(&peak.position) {
            Some(zone) => Classification {
                zone: Some(zone.name.clone()),
                level: Some(self.levels.level(peak.intensity)),
            },
            None => Classification {
                zone: None,
                level: None,
            },
        }
    }
}
