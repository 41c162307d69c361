//! Filter sessions.
//!
//! Each filter panel of the map owns one [`FilterSession`]: its query, the
//! cities and segments derived from it, its animation state and its display
//! toggles. Sessions live in a [`SessionTable`] keyed by [`SessionId`].
//!
//! Every action that invalidates a session's pending reveals bumps its
//! generation. Reveals carry the generation they were scheduled under and
//! are dropped if it no longer matches.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::aggregation::{AggregationResult, CityAggregate, OccurrenceEvent};
use crate::error::{OptionExt, Result};
use crate::filter::FilterPredicate;
use crate::scheduler::AnimationState;
use crate::segments::{SegmentTable, TravelSegment};
use crate::spatial::CityIndex;
use crate::styling::session_color;
use crate::{Coordinate, SessionId, TravelRecord};

/// The query of one filter panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterQuery {
    pub predicate: FilterPredicate,
    /// Cap on the number of cities; `None` uses the engine configuration
    pub max_results: Option<usize>,
}

impl FilterQuery {
    /// Query on a predicate with the configured cap.
    pub fn new(predicate: FilterPredicate) -> Self {
        Self {
            predicate,
            max_results: None,
        }
    }

    /// Override the city cap.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }
}

/// A displayable feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum Feature {
    City(CityAggregate),
    Travel(TravelSegment),
}

impl Feature {
    /// Display label with occurrence count.
    pub fn label(&self) -> String {
        match self {
            Feature::City(city) => city.label(),
            Feature::Travel(segment) => segment.label(),
        }
    }

    /// Number of citations behind the feature.
    pub fn occurrence_count(&self) -> usize {
        match self {
            Feature::City(city) => city.occurrence_count(),
            Feature::Travel(segment) => segment.occurrence_count(),
        }
    }
}

/// State of one filter panel.
#[derive(Debug)]
pub struct FilterSession {
    pub id: SessionId,
    pub color: &'static str,
    query: FilterQuery,
    aggregation: AggregationResult,
    /// Matching travel records (travels dataset only)
    travels: Vec<TravelRecord>,
    segments: SegmentTable,
    city_index: CityIndex,
    state: AnimationState,
    generation: u64,
    revealed: usize,
    travels_visible: bool,
    cities_visible: bool,
    /// Holds a filter result (set by `populate`, cleared by `reset`)
    populated: bool,
}

impl FilterSession {
    /// Create an empty session.
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            color: session_color(id.0),
            query: FilterQuery::default(),
            aggregation: AggregationResult::default(),
            travels: Vec::new(),
            segments: SegmentTable::new(),
            city_index: CityIndex::default(),
            state: AnimationState::Idle,
            generation: 0,
            revealed: 0,
            travels_visible: false,
            cities_visible: false,
            populated: false,
        }
    }

    pub fn query(&self) -> &FilterQuery {
        &self.query
    }

    pub fn aggregation(&self) -> &AggregationResult {
        &self.aggregation
    }

    /// Cities ranked by occurrence count.
    pub fn cities(&self) -> &[CityAggregate] {
        &self.aggregation.cities
    }

    /// Chronological occurrence events.
    pub fn events(&self) -> &[OccurrenceEvent] {
        &self.aggregation.events
    }

    /// Matching travel records (travels dataset).
    pub fn travels(&self) -> &[TravelRecord] {
        &self.travels
    }

    pub fn segments(&self) -> &SegmentTable {
        &self.segments
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of reveals applied since the last animation started.
    pub fn revealed(&self) -> usize {
        self.revealed
    }

    pub fn travels_visible(&self) -> bool {
        self.travels_visible
    }

    pub fn cities_visible(&self) -> bool {
        self.cities_visible
    }

    /// True once a filter result is shown, until the session is cleared.
    pub fn is_populated(&self) -> bool {
        self.populated
    }

    /// Citations shown by this session (its share of the map total).
    pub fn entry_count(&self) -> usize {
        self.aggregation.events.len()
            + self.travels.iter().map(|t| t.entries.len()).sum::<usize>()
    }

    /// True if a reveal scheduled under `generation` may still be applied.
    pub fn accepts(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Invalidate pending reveals and return to `Idle`.
    pub(crate) fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.state = AnimationState::Idle;
        self.generation
    }

    /// Replace all derived data with a fresh filter result.
    pub(crate) fn populate(
        &mut self,
        query: FilterQuery,
        aggregation: AggregationResult,
        travels: Vec<TravelRecord>,
    ) {
        self.query = query;
        self.city_index = CityIndex::build(&aggregation.cities);
        self.aggregation = aggregation;
        self.travels = travels;
        self.segments = SegmentTable::new();
        self.revealed = 0;
        self.travels_visible = true;
        self.cities_visible = true;
        self.populated = true;
    }

    pub(crate) fn set_visibility(&mut self, travels: bool, cities: bool) {
        self.travels_visible = travels;
        self.cities_visible = cities;
    }

    pub(crate) fn set_segments(&mut self, segments: SegmentTable) {
        self.segments = segments;
    }

    /// Forget the query and everything derived from it.
    pub(crate) fn reset(&mut self) {
        self.query = FilterQuery::default();
        self.aggregation = AggregationResult::default();
        self.travels.clear();
        self.segments = SegmentTable::new();
        self.city_index = CityIndex::default();
        self.revealed = 0;
        self.travels_visible = false;
        self.cities_visible = false;
        self.populated = false;
        self.state = AnimationState::Idle;
    }

    pub(crate) fn set_state(&mut self, state: AnimationState) {
        self.state = state;
    }

    pub(crate) fn mark_revealed(&mut self) {
        self.revealed += 1;
        if self.state == AnimationState::Scheduled {
            self.state = AnimationState::Animating;
        }
    }

    /// Flip travel visibility; returns the new value.
    pub fn toggle_travels(&mut self) -> bool {
        self.travels_visible = !self.travels_visible;
        self.travels_visible
    }

    /// Flip city visibility; returns the new value.
    pub fn toggle_cities(&mut self) -> bool {
        self.cities_visible = !self.cities_visible;
        self.cities_visible
    }

    /// Features currently shown, cities first.
    pub fn features(&self) -> Vec<Feature> {
        let mut features = Vec::new();
        if self.cities_visible {
            features.extend(self.aggregation.cities.iter().cloned().map(Feature::City));
        }
        if self.travels_visible {
            features.extend(self.segments.iter().cloned().map(Feature::Travel));
        }
        features
    }

    /// City marker nearest to `at`, within `radius_degrees`.
    pub fn city_at(&self, at: Coordinate, radius_degrees: f64) -> Option<&CityAggregate> {
        self.city_index
            .nearest(at, radius_degrees)
            .and_then(|i| self.aggregation.cities.get(i))
    }
}

/// All filter sessions, keyed by id.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: HashMap<SessionId, FilterSession>,
    next_id: u32,
}

impl SessionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session; ids are never reused.
    pub fn add_session(&mut self) -> SessionId {
        let id = SessionId(self.next_id);
        self.next_id += 1;
        self.sessions.insert(id, FilterSession::new(id));
        id
    }

    pub fn get(&self, id: SessionId) -> Result<&FilterSession> {
        self.sessions.get(&id).ok_or_unknown_session(id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Result<&mut FilterSession> {
        self.sessions.get_mut(&id).ok_or_unknown_session(id)
    }

    /// Remove a session.
    pub fn remove(&mut self, id: SessionId) -> Result<FilterSession> {
        self.sessions.remove(&id).ok_or_unknown_session(id)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Session ids in creation order.
    pub fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Sum of citations shown across all sessions.
    pub fn total_entries(&self) -> usize {
        self.sessions.values().map(FilterSession::entry_count).sum()
    }
}
