//! FFI bindings for map front ends.
//!
//! Stateless helpers the front end calls while drawing. Stateful controls
//! (filters, animation, clock) live in [`crate::engine::engine_ffi`]. All
//! FFI functions here are prefixed with `ffi_` to avoid naming conflicts
//! with the internal API.

use log::{info, warn};

use crate::{
    draw_progress, init_logging, marker_width, session_color, stroke_width, with_engine,
    TrailConfig,
};

// ============================================================================
// Configuration
// ============================================================================

/// Default configuration as JSON.
#[uniffi::export]
pub fn ffi_default_config_json() -> String {
    serde_json::to_string(&TrailConfig::default()).unwrap_or_else(|_| "{}".to_string())
}

/// Replace the engine configuration from (possibly partial) JSON.
#[uniffi::export]
pub fn ffi_set_config_json(json: String) -> bool {
    init_logging();
    match TrailConfig::from_json_str(&json).and_then(|c| with_engine(|e| e.set_config(c))) {
        Ok(()) => {
            info!("[TravelTrailsRust] Configuration updated");
            true
        }
        Err(e) => {
            warn!("[TravelTrailsRust] Rejected configuration: {}", e);
            false
        }
    }
}

// ============================================================================
// Drawing Helpers
// ============================================================================

/// Color of the n-th filter panel.
#[uniffi::export]
pub fn ffi_session_color(index: u32) -> String {
    session_color(index).to_string()
}

/// Color of the hovered feature.
#[uniffi::export]
pub fn ffi_selected_color() -> String {
    crate::styling::SELECTED_COLOR.to_string()
}

/// Marker width of a city with `count` of `total` citations.
#[uniffi::export]
pub fn ffi_marker_width(count: u32, total: u32) -> f64 {
    with_engine(|e| marker_width(count as usize, total as usize, e.config()))
}

/// Stroke width of a travel with `count` of `total` citations.
#[uniffi::export]
pub fn ffi_stroke_width(count: u32, total: u32) -> f64 {
    with_engine(|e| stroke_width(count as usize, total as usize, e.config()))
}

/// Number of points of a revealed fragment to draw after `elapsed_ms`.
#[uniffi::export]
pub fn ffi_draw_progress(fragment_len: u32, elapsed_ms: f64) -> u32 {
    let points_per_ms = with_engine(|e| e.config().points_per_ms);
    draw_progress(fragment_len as usize, elapsed_ms, points_per_ms).points as u32
}

// ============================================================================
// Corpus Fetching
// ============================================================================

/// Download the corpus and load it into the engine.
#[cfg(feature = "http")]
#[uniffi::export]
pub fn ffi_fetch_corpus(url: String) -> bool {
    init_logging();
    info!("[TravelTrailsRust] Fetching corpus from {}", url);
    match crate::http::fetch_corpus_blocking(&url) {
        Ok(corpus) => {
            with_engine(|e| e.load_corpus(corpus));
            true
        }
        Err(e) => {
            warn!("[TravelTrailsRust] Corpus fetch failed: {}", e);
            false
        }
    }
}
