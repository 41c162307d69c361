//! # Travel Trails
//!
//! Travel aggregation and animation scheduling for maps of historical
//! corpora: journeys between places mentioned in a body of texts, replayed
//! as animated great-circle arcs between city markers.
//!
//! This library provides:
//! - Corpus loading for the `cities` and `travels` dataset variants
//! - Author/title/year filtering of corpus citations
//! - Aggregation of citations into ranked city markers
//! - Deduplicated travel segments between consecutive cities
//! - Reveal scheduling so segments animate as one continuous trail
//!
//! ## Features
//!
//! - **`ffi`** - Enable FFI bindings for map front ends
//! - **`http`** - Enable HTTP client for fetching the corpus resource
//! - **`cli`** - Build the `trails-cli` debugging tool
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use travel_trails::{FilterQuery, TrailEngine};
//!
//! let json = r#"{"cities": [
//!     {"coordinates": ["48.85", "2.35"], "description": "Paris",
//!      "infos": {"author": "Smith", "title": "Letters", "year": 1800, "url": ""}},
//!     {"coordinates": ["41.90", "12.49"], "description": "Rome",
//!      "infos": {"author": "Smith", "title": "Letters", "year": 1801, "url": ""}}
//! ]}"#;
//!
//! let mut engine = TrailEngine::new();
//! engine.load_corpus_json(json).unwrap();
//! let session = engine.add_filter();
//! engine.filter(session, FilterQuery::default()).unwrap();
//!
//! let plan = engine.animate(session).unwrap();
//! let reveals = engine.advance(plan.finish_ms);
//! assert_eq!(reveals.len(), plan.steps.len());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, TrailError};

// Tunable constants (draw speed, arc density, sizing)
pub mod config;
pub use config::TrailConfig;

// Corpus resource parsing
pub mod corpus;
pub use corpus::{Corpus, CorpusStats};

// Record filter (author/title/year predicates)
pub mod filter;
pub use filter::{filter_mentions, filter_travels, FilterPredicate, IndexedMention};

// Location aggregator (merge by coordinate, rank, truncate)
pub mod aggregation;
pub use aggregation::{
    aggregate_locations, AggregationResult, CityAggregate, Occurrence, OccurrenceEvent,
};

// Great-circle geometry provider
pub mod geometry;
pub use geometry::{
    great_circle_distance, ArcFragment, FragmentKind, GeometryProvider, GreatCircle,
};

// Segment builder (deduplicated city-pair travels)
pub mod segments;
pub use segments::{
    build_segments, segments_from_travels, SegmentOccurrence, SegmentTable, TravelSegment,
};

// Display sizing and zoom visibility
pub mod styling;
pub use styling::{marker_width, session_color, stroke_width, ZoomVisibility};

// Reveal planning for animations
pub mod scheduler;
pub use scheduler::{
    draw_progress, instant_plan, plan_reveals, AnimationConfig, AnimationState, DrawProgress,
    RevealPlan, RevealStep,
};

// Cancellable virtual-clock timers
pub mod timers;
pub use timers::{Fired, TaskHandle, TimerQueue};

// Spatial lookup of city markers
pub mod spatial;
pub use spatial::CityIndex;

// Filter sessions (one per filter panel)
pub mod session;
pub use session::{Feature, FilterQuery, FilterSession, SessionTable};

// Stateful engine (singleton with all session state)
pub mod engine;
pub use engine::{with_engine, EngineStats, FilterSummary, Reveal, TrailEngine, ENGINE};

// HTTP module for corpus fetching
#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{fetch_corpus, fetch_corpus_blocking};

// FFI bindings for map front ends
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("TravelTrailsRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // Hosts install their own logger
}

// ============================================================================
// Core Types
// ============================================================================

/// Identifier of a filter session (one filter panel in the UI).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A geographic coordinate with latitude and longitude in degrees.
///
/// # Example
/// ```
/// use travel_trails::Coordinate;
/// let paris = Coordinate::parse("48.8566", "2.3522").unwrap();
/// assert!(paris.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Create a new coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Parse a coordinate from the string pair stored in the corpus.
    ///
    /// Returns `None` if either component is not a number or the result is
    /// outside the valid latitude/longitude range.
    pub fn parse(latitude: &str, longitude: &str) -> Option<Self> {
        let lat = latitude.trim().parse::<f64>().ok()?;
        let lon = longitude.trim().parse::<f64>().ok()?;
        let coord = Self::new(lat, lon);
        coord.is_valid().then_some(coord)
    }

    /// Check if the coordinate is finite and within range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// Exact composite key used to merge records at the same place.
    pub fn key(&self) -> CoordinateKey {
        CoordinateKey::from(*self)
    }
}

/// Hashable key of a [`Coordinate`], compared component by component.
///
/// Two coordinates share a key only if both components are bit-identical
/// (with `-0.0` folded into `0.0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoordinateKey {
    lat_bits: u64,
    lon_bits: u64,
}

impl From<Coordinate> for CoordinateKey {
    fn from(coord: Coordinate) -> Self {
        // -0.0 == 0.0 but their bit patterns differ
        let normalize = |v: f64| if v == 0.0 { 0.0f64 } else { v };
        Self {
            lat_bits: normalize(coord.latitude).to_bits(),
            lon_bits: normalize(coord.longitude).to_bits(),
        }
    }
}

/// Direction-agnostic key of a city pair: `(A, B)` and `(B, A)` are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    low: CoordinateKey,
    high: CoordinateKey,
}

impl PairKey {
    /// Build the unordered key for two coordinates.
    pub fn new(a: Coordinate, b: Coordinate) -> Self {
        let (ka, kb) = (a.key(), b.key());
        if ka <= kb {
            Self { low: ka, high: kb }
        } else {
            Self { low: kb, high: ka }
        }
    }

    /// True if both ends are the same place.
    pub fn is_loop(&self) -> bool {
        self.low == self.high
    }
}

impl Serialize for PairKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let ends = [self.low, self.high]
            .map(|k| [f64::from_bits(k.lat_bits), f64::from_bits(k.lon_bits)]);
        ends.serialize(serializer)
    }
}

/// One citation of a place in a source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub author: String,
    pub title: String,
    pub year: i32,
    pub url: String,
}

impl CorpusEntry {
    /// Create a new corpus entry.
    pub fn new(author: &str, title: &str, year: i32, url: &str) -> Self {
        Self {
            author: author.to_string(),
            title: title.to_string(),
            year,
            url: url.to_string(),
        }
    }
}

/// A row of the `cities` dataset: one citation of one place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityMention {
    pub coordinate: Coordinate,
    pub description: String,
    pub entry: CorpusEntry,
}

impl CityMention {
    /// Create a new city mention.
    pub fn new(coordinate: Coordinate, description: &str, entry: CorpusEntry) -> Self {
        Self {
            coordinate,
            description: description.to_string(),
            entry,
        }
    }
}

/// A row of the `travels` dataset: one directed movement and its citations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelRecord {
    pub from: Coordinate,
    pub to: Coordinate,
    pub description: String,
    pub entries: Vec<CorpusEntry>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_parse() {
        let c = Coordinate::parse(" 10.5", "20 ").unwrap();
        assert_eq!(c, Coordinate::new(10.5, 20.0));
        assert!(Coordinate::parse("north", "20").is_none());
        assert!(Coordinate::parse("", "20").is_none());
        assert!(Coordinate::parse("91", "0").is_none());
        assert!(Coordinate::parse("NaN", "0").is_none());
    }

    #[test]
    fn test_coordinate_key_equality() {
        let a = Coordinate::new(10.0, 20.0);
        let b = Coordinate::new(10.0, 20.0);
        let c = Coordinate::new(10.0, 20.000001);
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
        assert_eq!(
            Coordinate::new(0.0, -0.0).key(),
            Coordinate::new(-0.0, 0.0).key()
        );
    }

    #[test]
    fn test_pair_key_is_unordered() {
        let a = Coordinate::new(10.0, 20.0);
        let b = Coordinate::new(30.0, 40.0);
        assert_eq!(PairKey::new(a, b), PairKey::new(b, a));
        assert!(!PairKey::new(a, b).is_loop());
        assert!(PairKey::new(a, a).is_loop());
    }

    #[test]
    fn test_session_id_display() {
        assert_eq!(SessionId(4).to_string(), "#4");
    }
}
