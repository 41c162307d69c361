//! Display sizing for the rendering collaborator.
//!
//! Marker and stroke widths grow with the square root of a feature's share
//! of all citations shown on the map, so one very common city does not
//! dwarf everything else. Cities whose marker would be too small at the
//! current zoom are hidden, which also removes them from travel replay.

use crate::TrailConfig;

/// Colors of the first filter sessions, in creation order.
pub const PALETTE: [&str; 8] = [
    "rgb(230, 25, 75)",
    "rgb(0,92,49)",
    "rgb(145, 30, 180)",
    "rgb(128, 0, 0)",
    "rgb(0, 0, 128)",
    "rgb(60, 180, 75)",
    "rgb(143,124,0)",
    "rgb(157,204,0)",
];

/// Color of sessions beyond the palette.
pub const DEFAULT_COLOR: &str = "rgb(255, 0, 0)";

/// Color of the selected (hovered) feature.
pub const SELECTED_COLOR: &str = "rgb(0, 0, 255)";

/// Color assigned to the n-th filter session.
pub fn session_color(index: u32) -> &'static str {
    PALETTE.get(index as usize).copied().unwrap_or(DEFAULT_COLOR)
}

fn share(count: usize, total_entries: usize) -> f64 {
    if total_entries == 0 {
        0.0
    } else {
        count as f64 / total_entries as f64
    }
}

/// Width of a city marker: `base + sqrt(count / total * size_ratio)`.
pub fn marker_width(count: usize, total_entries: usize, config: &TrailConfig) -> f64 {
    config.city_base_width + (share(count, total_entries) * config.size_ratio).sqrt()
}

/// Stroke width of a travel: `base + sqrt(count / total * size_ratio * factor)`.
pub fn stroke_width(count: usize, total_entries: usize, config: &TrailConfig) -> f64 {
    config.travel_base_width
        + (share(count, total_entries) * config.size_ratio * config.travel_size_factor).sqrt()
}

/// Zoom-dependent visibility of city markers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomVisibility {
    pub zoom: f64,
    pub threshold: f64,
}

impl ZoomVisibility {
    /// Create the predicate for a zoom level.
    pub fn new(zoom: f64, threshold: f64) -> Self {
        Self { zoom, threshold }
    }

    /// A marker is visible when `width * zoom` exceeds the threshold.
    pub fn is_visible(&self, width: f64) -> bool {
        width * self.zoom > self.threshold
    }
}
