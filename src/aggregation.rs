//! Location aggregator.
//!
//! Merges filtered city mentions sharing a coordinate into one
//! [`CityAggregate`], ranks the aggregates by how often the corpus cites
//! them, and keeps the top `max_results`. Ranking is by frequency, not
//! geography: rare places are dropped entirely rather than down-weighted.
//!
//! Alongside the cities it produces the chronological list of occurrence
//! events (one per surviving citation, in corpus order) that the segment
//! builder walks to reconstruct travels.

use std::collections::HashMap;

use serde::Serialize;

use crate::filter::IndexedMention;
use crate::{Coordinate, CoordinateKey, CorpusEntry};

/// One citation of a city, tagged with its corpus position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Occurrence {
    pub entry: CorpusEntry,
    /// Description used by this particular citation
    pub description: String,
    pub order: usize,
}

/// All citations of one place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityAggregate {
    pub coordinate: Coordinate,
    /// Description of the first citation seen
    pub description: String,
    /// Other descriptions used for the same place, first-seen order
    pub alternate_descriptions: Vec<String>,
    /// Citations sorted by corpus order
    pub occurrences: Vec<Occurrence>,
}

impl CityAggregate {
    fn new(coordinate: Coordinate, description: &str) -> Self {
        Self {
            coordinate,
            description: description.to_string(),
            alternate_descriptions: Vec::new(),
            occurrences: Vec::new(),
        }
    }

    fn push(&mut self, mention: &IndexedMention<'_>) {
        let description = &mention.mention.description;
        if *description != self.description && !self.alternate_descriptions.contains(description)
        {
            self.alternate_descriptions.push(description.clone());
        }
        self.occurrences.push(Occurrence {
            entry: mention.mention.entry.clone(),
            description: description.clone(),
            order: mention.order,
        });
    }

    /// Number of citations of this place.
    pub fn occurrence_count(&self) -> usize {
        self.occurrences.len()
    }

    /// Display label, e.g. `Paris(3)`.
    pub fn label(&self) -> String {
        format!("{}({})", self.description, self.occurrence_count())
    }

    /// Merge key of this place.
    pub fn key(&self) -> CoordinateKey {
        self.coordinate.key()
    }
}

/// One citation of a surviving city, in chronological replay order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OccurrenceEvent {
    pub coordinate: Coordinate,
    pub order: usize,
    pub description: String,
    pub entry: CorpusEntry,
}

/// Output of [`aggregate_locations`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregationResult {
    /// Cities ranked by occurrence count, most cited first
    pub cities: Vec<CityAggregate>,
    /// Citations of the ranked cities, sorted by corpus order
    pub events: Vec<OccurrenceEvent>,
}

impl AggregationResult {
    /// Sum of occurrence counts across all cities.
    pub fn total_occurrences(&self) -> usize {
        self.cities.iter().map(CityAggregate::occurrence_count).sum()
    }

    /// True if no city survived.
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    /// Index cities by coordinate key.
    pub fn by_key(&self) -> HashMap<CoordinateKey, &CityAggregate> {
        self.cities.iter().map(|c| (c.key(), c)).collect()
    }
}

/// Group filtered mentions by coordinate, rank, and truncate.
///
/// Ties in occurrence count keep first-seen order. Truncation to
/// `max_results` happens after ranking.
pub fn aggregate_locations(
    mentions: &[IndexedMention<'_>],
    max_results: Option<usize>,
) -> AggregationResult {
    let mut index: HashMap<CoordinateKey, usize> = HashMap::new();
    let mut cities: Vec<CityAggregate> = Vec::new();

    for mention in mentions {
        let coord = mention.mention.coordinate;
        let slot = *index.entry(coord.key()).or_insert_with(|| {
            cities.push(CityAggregate::new(coord, &mention.mention.description));
            cities.len() - 1
        });
        cities[slot].push(mention);
    }

    for city in &mut cities {
        city.occurrences.sort_by_key(|o| o.order);
    }

    // Vec::sort_by is stable, so equal counts stay in first-seen order
    cities.sort_by(|a, b| b.occurrence_count().cmp(&a.occurrence_count()));
    if let Some(max) = max_results {
        cities.truncate(max);
    }

    let mut events: Vec<OccurrenceEvent> = cities
        .iter()
        .flat_map(|city| {
            city.occurrences.iter().map(|o| OccurrenceEvent {
                coordinate: city.coordinate,
                order: o.order,
                description: o.description.clone(),
                entry: o.entry.clone(),
            })
        })
        .collect();
    events.sort_by_key(|e| e.order);

    AggregationResult { cities, events }
}
