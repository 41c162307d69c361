//! Configuration for reveal scheduling and display sizing.
//!
//! Every field has a default, so a configuration file only needs to name the
//! values it changes:
//!
//! ```rust
//! use travel_trails::TrailConfig;
//!
//! let config = TrailConfig::from_json_str(r#"{"points_per_ms": 0.5}"#).unwrap();
//! assert_eq!(config.points_per_ms, 0.5);
//! assert_eq!(config.points_per_arc, 100);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrailError};
use crate::scheduler::AnimationConfig;

/// Divisor applied to the draw-speed slider value.
pub const SLIDER_SCALE: f64 = 40.0;

/// Tunable constants of the trail engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailConfig {
    /// Draw speed in arc points per millisecond.
    /// Default: 0.3
    pub points_per_ms: f64,

    /// Number of points per arc. More points give rounder arcs and longer draws.
    /// Default: 100
    pub points_per_arc: usize,

    /// Maximum number of locations kept per filter (most cited first).
    /// `None` keeps every location. Default: 50
    pub max_results: Option<usize>,

    /// How zoomed in the map must be for rarely cited cities to appear.
    /// The lower the value, the sooner small cities appear. Default: 90.0
    pub zoom_threshold: f64,

    /// How much bigger frequently cited cities are drawn compared to rare ones.
    /// Default: 50000.0
    pub size_ratio: f64,

    /// Marker width of a city before its citation share is added.
    /// Default: 5.0
    pub city_base_width: f64,

    /// Stroke width of a travel before its citation share is added.
    /// Default: 0.5
    pub travel_base_width: f64,

    /// Multiplier applied to `size_ratio` for travel strokes.
    /// Default: 0.2
    pub travel_size_factor: f64,

    /// Zoom level of the map when the engine starts.
    /// Default: 2.0
    pub initial_zoom: f64,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            points_per_ms: 0.3,
            points_per_arc: 100,
            max_results: Some(50),
            zoom_threshold: 90.0,
            size_ratio: 50000.0,
            city_base_width: 5.0,
            travel_base_width: 0.5,
            travel_size_factor: 0.2,
            initial_zoom: 2.0,
        }
    }
}

impl TrailConfig {
    /// Parse a (possibly partial) JSON configuration over the defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: TrailConfig =
            serde_json::from_str(json).map_err(|e| TrailError::ConfigError {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| TrailError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&json)
    }

    /// Reject values that would make scheduling meaningless.
    pub fn validate(&self) -> Result<()> {
        if !(self.points_per_ms.is_finite() && self.points_per_ms > 0.0) {
            return Err(TrailError::ConfigError {
                message: format!("points_per_ms must be positive, got {}", self.points_per_ms),
            });
        }
        if self.points_per_arc < 2 {
            return Err(TrailError::ConfigError {
                message: format!("points_per_arc must be at least 2, got {}", self.points_per_arc),
            });
        }
        if self.size_ratio < 0.0 || !self.size_ratio.is_finite() {
            return Err(TrailError::ConfigError {
                message: format!("size_ratio must be non-negative, got {}", self.size_ratio),
            });
        }
        Ok(())
    }

    /// Scheduling parameters derived from this configuration.
    pub fn animation(&self) -> AnimationConfig {
        AnimationConfig::new(self.points_per_ms, self.points_per_arc)
    }

    /// Apply a draw-speed slider value (`points_per_ms = slider / 40`).
    pub fn set_draw_speed(&mut self, slider: f64) -> Result<()> {
        let points_per_ms = slider / SLIDER_SCALE;
        if !(points_per_ms.is_finite() && points_per_ms > 0.0) {
            return Err(TrailError::InvalidQuery {
                field: "animationSpeed".to_string(),
                value: slider.to_string(),
            });
        }
        self.points_per_ms = points_per_ms;
        Ok(())
    }

    /// Slider position matching the current draw speed.
    pub fn draw_speed_slider(&self) -> f64 {
        self.points_per_ms * SLIDER_SCALE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrailConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_results, Some(50));
        let animation = config.animation();
        assert!((animation.delay_between_units() - 100.0 / 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_partial_json() {
        let config = TrailConfig::from_json_str(r#"{"max_results": null, "zoom_threshold": 40}"#)
            .unwrap();
        assert_eq!(config.max_results, None);
        assert_eq!(config.zoom_threshold, 40.0);
        assert_eq!(config.size_ratio, 50000.0);
    }

    #[test]
    fn test_rejects_zero_speed() {
        let result = TrailConfig::from_json_str(r#"{"points_per_ms": 0}"#);
        assert!(matches!(result, Err(TrailError::ConfigError { .. })));
    }

    #[test]
    fn test_draw_speed_slider() {
        let mut config = TrailConfig::default();
        config.set_draw_speed(20.0).unwrap();
        assert_eq!(config.points_per_ms, 0.5);
        assert_eq!(config.draw_speed_slider(), 20.0);
        assert!(config.set_draw_speed(0.0).is_err());
        assert_eq!(config.points_per_ms, 0.5);
    }
}
