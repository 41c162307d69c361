//! Segment builder.
//!
//! Reconstructs travels by walking the chronological occurrence events and
//! connecting each visible city to the next visible city at a different
//! place. A city pair gets exactly one [`TravelSegment`] per table no matter
//! which direction or how often it is travelled; repeats only add an
//! occurrence, so arc geometry is computed once per pair.

use std::collections::HashMap;

use log::debug;
use serde::Serialize;

use crate::aggregation::{CityAggregate, OccurrenceEvent};
use crate::geometry::{ArcFragment, GeometryProvider};
use crate::{Coordinate, CoordinateKey, PairKey, TravelRecord};

/// One traversal of a segment: the citation left and the citation reached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentOccurrence {
    pub from: OccurrenceEvent,
    pub to: OccurrenceEvent,
}

/// A deduplicated travel between two cities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TravelSegment {
    pub key: PairKey,
    /// Start of the first traversal
    pub from: Coordinate,
    /// End of the first traversal
    pub to: Coordinate,
    /// `From-To` description of the first traversal
    pub description: String,
    pub occurrences: Vec<SegmentOccurrence>,
    /// Arc geometry, computed once when the segment is created
    pub fragments: Vec<ArcFragment>,
}

impl TravelSegment {
    /// Number of times this pair was travelled.
    pub fn occurrence_count(&self) -> usize {
        self.occurrences.len()
    }

    /// Display label, e.g. `Paris-Rome(2)`.
    pub fn label(&self) -> String {
        format!("{}({})", self.description, self.occurrence_count())
    }

    /// Total number of arc points across fragments.
    pub fn point_count(&self) -> usize {
        self.fragments.iter().map(ArcFragment::len).sum()
    }
}

/// Segments of one session, in creation order, indexed by city pair.
#[derive(Debug, Clone, Default)]
pub struct SegmentTable {
    segments: Vec<TravelSegment>,
    index: HashMap<PairKey, usize>,
}

impl SegmentTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the segment of a city pair.
    pub fn get(&self, key: &PairKey) -> Option<&TravelSegment> {
        self.index.get(key).map(|&i| &self.segments[i])
    }

    fn get_mut(&mut self, key: &PairKey) -> Option<&mut TravelSegment> {
        match self.index.get(key) {
            Some(&i) => self.segments.get_mut(i),
            None => None,
        }
    }

    fn insert(&mut self, segment: TravelSegment) {
        self.index.insert(segment.key, self.segments.len());
        self.segments.push(segment);
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True if the table has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segments in creation order.
    pub fn as_slice(&self) -> &[TravelSegment] {
        &self.segments
    }

    /// Iterate segments in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &TravelSegment> {
        self.segments.iter()
    }

    /// Sum of occurrence counts across segments.
    pub fn total_occurrences(&self) -> usize {
        self.segments.iter().map(TravelSegment::occurrence_count).sum()
    }
}

/// Build segments from chronological occurrence events.
///
/// `is_visible` decides whether a city currently takes part (driven by zoom
/// in the map). Replay starts at the first visible city; events at the same
/// place as the current position or at hidden cities are skipped without
/// moving the position. Pairs for which `geometry` yields no fragments are
/// skipped.
pub fn build_segments<V, G>(
    events: &[OccurrenceEvent],
    cities: &[CityAggregate],
    is_visible: V,
    geometry: &G,
    points_per_arc: usize,
) -> SegmentTable
where
    V: Fn(&CityAggregate) -> bool,
    G: GeometryProvider + ?Sized,
{
    let by_key: HashMap<CoordinateKey, &CityAggregate> =
        cities.iter().map(|c| (c.key(), c)).collect();
    let mut table = SegmentTable::new();
    let mut current: Option<(&OccurrenceEvent, &CityAggregate)> = None;

    for event in events {
        let Some(&city) = by_key.get(&event.coordinate.key()) else {
            continue;
        };

        let Some((prev, prev_city)) = current else {
            if is_visible(city) {
                current = Some((event, city));
            }
            continue;
        };

        if prev_city.key() == city.key() || !is_visible(city) {
            continue;
        }

        let key = PairKey::new(prev.coordinate, event.coordinate);
        let occurrence = SegmentOccurrence {
            from: prev.clone(),
            to: event.clone(),
        };

        if let Some(segment) = table.get_mut(&key) {
            segment.occurrences.push(occurrence);
        } else {
            let fragments = geometry.arc(prev.coordinate, event.coordinate, points_per_arc);
            if fragments.is_empty() {
                debug!(
                    "[Segments] No arc between '{}' and '{}', skipping pair",
                    prev_city.description, city.description
                );
                continue;
            }
            table.insert(TravelSegment {
                key,
                from: prev.coordinate,
                to: event.coordinate,
                description: format!("{}-{}", prev_city.description, city.description),
                occurrences: vec![occurrence],
                fragments,
            });
        }
        current = Some((event, city));
    }

    table
}

/// Build segments directly from travel records (the `travels` dataset).
///
/// Each citation of a travel counts as one occurrence; records sharing a
/// city pair in either direction merge into the first segment.
pub fn segments_from_travels<G>(
    travels: &[TravelRecord],
    geometry: &G,
    points_per_arc: usize,
) -> SegmentTable
where
    G: GeometryProvider + ?Sized,
{
    let mut table = SegmentTable::new();

    for (order, travel) in travels.iter().enumerate() {
        let key = PairKey::new(travel.from, travel.to);
        if key.is_loop() {
            continue;
        }
        let occurrences = travel.entries.iter().map(|entry| SegmentOccurrence {
            from: OccurrenceEvent {
                coordinate: travel.from,
                order,
                description: travel.description.clone(),
                entry: entry.clone(),
            },
            to: OccurrenceEvent {
                coordinate: travel.to,
                order,
                description: travel.description.clone(),
                entry: entry.clone(),
            },
        });

        if let Some(segment) = table.get_mut(&key) {
            segment.occurrences.extend(occurrences);
            continue;
        }
        let fragments = geometry.arc(travel.from, travel.to, points_per_arc);
        if fragments.is_empty() {
            continue;
        }
        table.insert(TravelSegment {
            key,
            from: travel.from,
            to: travel.to,
            description: travel.description.clone(),
            occurrences: occurrences.collect(),
            fragments,
        });
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::aggregate_locations;
    use crate::filter::IndexedMention;
    use crate::geometry::GreatCircle;
    use crate::{CityMention, CorpusEntry};

    fn route(stops: &[(f64, f64, &str)]) -> Vec<CityMention> {
        stops
            .iter()
            .map(|&(lat, lon, desc)| {
                CityMention::new(
                    Coordinate::new(lat, lon),
                    desc,
                    CorpusEntry::new("A", "T", 1800, ""),
                )
            })
            .collect()
    }

    fn build(mentions: &[CityMention], visible: impl Fn(&CityAggregate) -> bool) -> SegmentTable {
        let indexed: Vec<IndexedMention<'_>> = mentions
            .iter()
            .enumerate()
            .map(|(order, mention)| IndexedMention { order, mention })
            .collect();
        let agg = aggregate_locations(&indexed, None);
        build_segments(&agg.events, &agg.cities, visible, &GreatCircle, 100)
    }

    #[test]
    fn test_round_trip_dedup() {
        let stops = route(&[(10.0, 20.0, "A"), (30.0, 40.0, "B"), (10.0, 20.0, "A")]);
        let table = build(&stops, |_| true);
        assert_eq!(table.len(), 1);
        let segment = &table.as_slice()[0];
        assert_eq!(segment.occurrence_count(), 2);
        assert_eq!(segment.description, "A-B");
        assert_eq!(segment.label(), "A-B(2)");
    }

    #[test]
    fn test_same_place_events_skipped() {
        let stops = route(&[(10.0, 20.0, "A"), (10.0, 20.0, "A"), (30.0, 40.0, "B")]);
        let table = build(&stops, |_| true);
        assert_eq!(table.len(), 1);
        assert_eq!(table.as_slice()[0].occurrences[0].from.order, 0);
    }

    #[test]
    fn test_start_waits_for_visible_city() {
        let stops = route(&[
            (1.0, 1.0, "Hidden"),
            (10.0, 20.0, "A"),
            (30.0, 40.0, "B"),
        ]);
        let table = build(&stops, |c| c.description != "Hidden");
        assert_eq!(table.len(), 1);
        assert_eq!(table.as_slice()[0].description, "A-B");
    }

    #[test]
    fn test_hidden_destination_keeps_position() {
        let stops = route(&[
            (10.0, 20.0, "A"),
            (1.0, 1.0, "Hidden"),
            (30.0, 40.0, "B"),
        ]);
        let table = build(&stops, |c| c.description != "Hidden");
        assert_eq!(table.len(), 1);
        assert_eq!(table.as_slice()[0].description, "A-B");
    }

    #[test]
    fn test_no_visible_city() {
        let stops = route(&[(10.0, 20.0, "A"), (30.0, 40.0, "B")]);
        assert!(build(&stops, |_| false).is_empty());
    }

    #[test]
    fn test_travels_merge_both_directions() {
        let a = Coordinate::new(10.0, 20.0);
        let b = Coordinate::new(30.0, 40.0);
        let travels = vec![
            TravelRecord {
                from: a,
                to: b,
                description: "A-B".to_string(),
                entries: vec![CorpusEntry::new("X", "T", 1800, "")],
            },
            TravelRecord {
                from: b,
                to: a,
                description: "B-A".to_string(),
                entries: vec![
                    CorpusEntry::new("Y", "T", 1801, ""),
                    CorpusEntry::new("Z", "T", 1802, ""),
                ],
            },
            TravelRecord {
                from: a,
                to: a,
                description: "A-A".to_string(),
                entries: vec![CorpusEntry::new("X", "T", 1800, "")],
            },
        ];
        let table = segments_from_travels(&travels, &GreatCircle, 100);
        assert_eq!(table.len(), 1);
        assert_eq!(table.as_slice()[0].occurrence_count(), 3);
        assert!(table.get(&PairKey::new(b, a)).is_some());
    }
}
