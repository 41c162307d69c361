//! Corpus resource parsing.
//!
//! The corpus is a static JSON document in one of two shapes:
//!
//! ```json
//! { "cities":  [ { "coordinates": ["lat", "lon"], "description": "...", "infos": { ... } } ] }
//! { "travels": [ { "coordinates": [[lat, lon], [lat, lon]], "description": "...", "infos": [ ... ] } ] }
//! ```
//!
//! Curation of the corpus is permissive, so rows whose coordinates or
//! citation fields cannot be used are skipped (and counted) instead of
//! failing the whole load.

use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TrailError};
use crate::{CityMention, Coordinate, CorpusEntry, TravelRecord};

// ============================================================================
// Raw resource shape
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawCorpus {
    #[serde(default)]
    cities: Option<Vec<Value>>,
    #[serde(default)]
    travels: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct RawCity {
    #[serde(default)]
    coordinates: Value,
    #[serde(default)]
    description: Value,
    #[serde(default)]
    infos: Value,
}

#[derive(Debug, Deserialize)]
struct RawTravel {
    #[serde(default)]
    coordinates: Value,
    #[serde(default)]
    description: Value,
    #[serde(default)]
    infos: Value,
}

/// City rows carry a single info object, travel rows an array. Each info is
/// converted on its own so one malformed citation only drops itself.
fn infos(value: Value) -> Vec<Value> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        other => vec![other],
    }
}

/// Descriptions are labels only; anything but a string reads as empty.
fn description(value: &Value) -> String {
    value.as_str().unwrap_or_default().to_string()
}

#[derive(Debug, Deserialize)]
struct RawInfo {
    #[serde(default)]
    author: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    year: Value,
    #[serde(default)]
    url: String,
}

impl RawInfo {
    fn parse(value: Value) -> Option<CorpusEntry> {
        serde_json::from_value::<RawInfo>(value).ok()?.into_entry()
    }

    fn into_entry(self) -> Option<CorpusEntry> {
        let year = number(&self.year)?;
        if year.fract() != 0.0 || year < i32::MIN as f64 || year > i32::MAX as f64 {
            return None;
        }
        Some(CorpusEntry {
            author: self.author,
            title: self.title,
            year: year as i32,
            url: self.url,
        })
    }
}

/// Read a number stored either as a JSON number or a numeric string.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Read a `[lat, lon]` pair.
fn coordinate(value: &Value) -> Option<Coordinate> {
    match value.as_array()?.as_slice() {
        [lat, lon] => {
            let coord = Coordinate::new(number(lat)?, number(lon)?);
            coord.is_valid().then_some(coord)
        }
        _ => None,
    }
}

/// Read a `[[lat, lon], [lat, lon]]` pair of coordinates.
fn coordinate_pair(value: &Value) -> Option<(Coordinate, Coordinate)> {
    match value.as_array()?.as_slice() {
        [from, to] => Some((coordinate(from)?, coordinate(to)?)),
        _ => None,
    }
}

// ============================================================================
// Corpus
// ============================================================================

/// Counters describing a parsed corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CorpusStats {
    /// Rows in the `cities` array
    pub city_rows: usize,
    /// Rows in the `travels` array
    pub travel_rows: usize,
    /// City mentions kept
    pub mentions: usize,
    /// Travel records kept
    pub travels: usize,
    /// Rows or citations skipped because they could not be resolved
    pub skipped: usize,
}

/// A parsed corpus. Immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    /// City mentions in corpus order; the index is the mention's `order`.
    pub mentions: Vec<CityMention>,
    /// Travel records in corpus order.
    pub travels: Vec<TravelRecord>,
    pub stats: CorpusStats,
}

impl Corpus {
    /// Build a corpus directly from city mentions.
    pub fn from_mentions(mentions: Vec<CityMention>) -> Self {
        let stats = CorpusStats {
            city_rows: mentions.len(),
            mentions: mentions.len(),
            ..CorpusStats::default()
        };
        Self {
            mentions,
            travels: Vec::new(),
            stats,
        }
    }

    /// Build a corpus directly from travel records.
    pub fn from_travels(travels: Vec<TravelRecord>) -> Self {
        let stats = CorpusStats {
            travel_rows: travels.len(),
            travels: travels.len(),
            ..CorpusStats::default()
        };
        Self {
            mentions: Vec::new(),
            travels,
            stats,
        }
    }

    /// Parse the corpus JSON resource.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawCorpus = serde_json::from_str(json)?;
        if raw.cities.is_none() && raw.travels.is_none() {
            return Err(TrailError::CorpusParse {
                message: "expected a `cities` or `travels` array".to_string(),
            });
        }

        let mut corpus = Corpus::default();

        for row in raw.cities.unwrap_or_default() {
            corpus.stats.city_rows += 1;
            let Ok(city) = serde_json::from_value::<RawCity>(row) else {
                corpus.stats.skipped += 1;
                continue;
            };
            let label = description(&city.description);
            let Some(coord) = coordinate(&city.coordinates) else {
                debug!("[Corpus] Skipping city '{}': unusable coordinates", label);
                corpus.stats.skipped += 1;
                continue;
            };
            let infos = infos(city.infos);
            if infos.is_empty() {
                corpus.stats.skipped += 1;
                continue;
            }
            for info in infos {
                match RawInfo::parse(info) {
                    Some(entry) => corpus
                        .mentions
                        .push(CityMention::new(coord, &label, entry)),
                    None => corpus.stats.skipped += 1,
                }
            }
        }

        for row in raw.travels.unwrap_or_default() {
            corpus.stats.travel_rows += 1;
            let Ok(travel) = serde_json::from_value::<RawTravel>(row) else {
                corpus.stats.skipped += 1;
                continue;
            };
            let label = description(&travel.description);
            let Some((from, to)) = coordinate_pair(&travel.coordinates) else {
                debug!("[Corpus] Skipping travel '{}': unusable coordinates", label);
                corpus.stats.skipped += 1;
                continue;
            };
            let infos = infos(travel.infos);
            let total = infos.len();
            let entries: Vec<CorpusEntry> = infos.into_iter().filter_map(RawInfo::parse).collect();
            corpus.stats.skipped += total - entries.len();
            if entries.is_empty() {
                if total == 0 {
                    corpus.stats.skipped += 1;
                }
                continue;
            }
            corpus.travels.push(TravelRecord {
                from,
                to,
                description: label,
                entries,
            });
        }

        corpus.stats.mentions = corpus.mentions.len();
        corpus.stats.travels = corpus.travels.len();
        info!(
            "[Corpus] Loaded {} mentions and {} travels ({} skipped)",
            corpus.stats.mentions, corpus.stats.travels, corpus.stats.skipped
        );
        Ok(corpus)
    }

    /// Load the corpus from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| TrailError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&json)
    }

    /// True if the corpus uses the `travels` variant only.
    pub fn is_travel_dataset(&self) -> bool {
        self.mentions.is_empty() && !self.travels.is_empty()
    }

    /// True if nothing usable was loaded.
    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty() && self.travels.is_empty()
    }
}
