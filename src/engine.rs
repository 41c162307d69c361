//! # Trail Engine
//!
//! Stateful engine behind the map's filter panels. The corpus, every filter
//! session and all pending reveal timers live here, so a front end only
//! forwards user actions and draws what [`TrailEngine::advance`] returns.
//!
//! ## Architecture
//!
//! The engine is a singleton that manages:
//! - The loaded corpus (immutable until the next load)
//! - One [`FilterSession`] per filter panel
//! - A [`TimerQueue`] of pending reveals on a virtual clock
//! - The map zoom, which decides which cities take part in travels
//!
//! Marker sizes depend on the citations shown by *all* sessions, so any
//! action that changes a session's contents rebuilds the segments of every
//! session. Pending reveals carry their own copy of the segment they draw
//! and are not affected by a rebuild.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use log::{debug, info};
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::aggregation::{aggregate_locations, CityAggregate};
use crate::filter::{filter_mentions, filter_travels};
use crate::geometry::{ArcFragment, GeometryProvider, GreatCircle};
use crate::scheduler::{plan_reveals, AnimationState, RevealPlan, RevealStep};
use crate::segments::{build_segments, segments_from_travels, TravelSegment};
use crate::session::{Feature, FilterQuery, FilterSession, SessionTable};
use crate::styling::{marker_width, stroke_width, ZoomVisibility};
use crate::timers::{Fired, TimerQueue};
use crate::{Coordinate, Corpus, CorpusStats, Result, SessionId, TrailConfig, TrailError};

// ============================================================================
// Core Types
// ============================================================================

/// Work waiting on the timer queue.
#[derive(Debug, Clone)]
enum TimerTask {
    /// Show one fragment of a segment
    Reveal {
        generation: u64,
        step: RevealStep,
        segment: TravelSegment,
    },
    /// The last fragment has finished drawing
    Finish { generation: u64 },
}

/// A fragment that is due to appear on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reveal {
    pub session: SessionId,
    pub generation: u64,
    /// Index of the segment in the session's table at scheduling time
    pub segment_index: usize,
    pub fragment_index: usize,
    /// Delay from the start of the animation
    pub delay_ms: f64,
    /// Time to draw the fragment
    pub draw_ms: f64,
    pub color: &'static str,
    pub segment: TravelSegment,
}

impl Reveal {
    /// The fragment to draw.
    pub fn fragment(&self) -> Option<&ArcFragment> {
        self.segment.fragments.get(self.fragment_index)
    }
}

/// Result of applying a filter to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilterSummary {
    pub session: SessionId,
    pub generation: u64,
    /// Cities kept after ranking and truncation
    pub cities: usize,
    /// Distinct travel segments
    pub segments: usize,
    /// Citations shown by the session
    pub entries: usize,
}

// ============================================================================
// Trail Engine
// ============================================================================

/// The main stateful trail engine.
pub struct TrailEngine {
    config: TrailConfig,
    corpus: Corpus,
    sessions: SessionTable,
    timers: TimerQueue<TimerTask>,
    geometry: Box<dyn GeometryProvider + Send>,
    zoom: f64,
}

impl TrailEngine {
    /// Create a new engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(TrailConfig::default())
    }

    /// Create a new engine with custom configuration.
    pub fn with_config(config: TrailConfig) -> Self {
        Self {
            zoom: config.initial_zoom,
            config,
            corpus: Corpus::default(),
            sessions: SessionTable::new(),
            timers: TimerQueue::new(),
            geometry: Box::new(GreatCircle),
        }
    }

    /// Replace the arc geometry provider.
    pub fn with_geometry(mut self, geometry: impl GeometryProvider + Send + 'static) -> Self {
        self.geometry = Box::new(geometry);
        self
    }

    pub fn config(&self) -> &TrailConfig {
        &self.config
    }

    /// Replace the configuration. Applies to segments immediately and to
    /// draw speed from the next animation on.
    pub fn set_config(&mut self, config: TrailConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        self.rebuild_segments();
        Ok(())
    }

    // ========================================================================
    // Corpus
    // ========================================================================

    /// Replace the corpus. Every session is cleared.
    pub fn load_corpus(&mut self, corpus: Corpus) -> CorpusStats {
        for id in self.sessions.ids() {
            if let Ok(session) = self.sessions.get_mut(id) {
                self.timers.cancel_all(id);
                session.next_generation();
                session.reset();
            }
        }
        let stats = corpus.stats;
        self.corpus = corpus;
        info!(
            "[TrailEngine] Corpus loaded: {} mentions, {} travels",
            stats.mentions, stats.travels
        );
        stats
    }

    /// Parse and load the corpus JSON resource.
    pub fn load_corpus_json(&mut self, json: &str) -> Result<CorpusStats> {
        let corpus = Corpus::from_json_str(json)?;
        Ok(self.load_corpus(corpus))
    }

    /// Load the corpus from a JSON file.
    pub fn load_corpus_file(&mut self, path: impl AsRef<Path>) -> Result<CorpusStats> {
        let corpus = Corpus::from_file(path)?;
        Ok(self.load_corpus(corpus))
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    /// Open a new filter panel.
    pub fn add_filter(&mut self) -> SessionId {
        let id = self.sessions.add_session();
        info!("[TrailEngine] Added filter {}", id);
        id
    }

    /// Close a filter panel, cancelling its pending reveals.
    pub fn remove_filter(&mut self, id: SessionId) -> Result<()> {
        self.sessions.remove(id)?;
        let cancelled = self.timers.cancel_all(id);
        info!("[TrailEngine] Removed filter {} ({} pending reveals cancelled)", id, cancelled);
        self.rebuild_segments();
        Ok(())
    }

    pub fn session(&self, id: SessionId) -> Result<&FilterSession> {
        self.sessions.get(id)
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.ids()
    }

    pub fn session_state(&self, id: SessionId) -> Result<AnimationState> {
        Ok(self.sessions.get(id)?.state())
    }

    /// Cancel a session's timers and invalidate anything already in flight.
    fn cancel(&mut self, id: SessionId) -> Result<u64> {
        let session = self.sessions.get_mut(id)?;
        let cancelled = self.timers.cancel_all(id);
        if cancelled > 0 {
            debug!("[TrailEngine] Cancelled {} pending tasks of {}", cancelled, id);
        }
        Ok(session.next_generation())
    }

    /// Apply a query to a session, replacing everything it showed.
    pub fn filter(&mut self, id: SessionId, query: FilterQuery) -> Result<FilterSummary> {
        let generation = self.cancel(id)?;

        let max_results = query.max_results.or(self.config.max_results);
        let matching = filter_mentions(&self.corpus.mentions, &query.predicate);
        let aggregation = aggregate_locations(&matching, max_results);
        let travels = filter_travels(&self.corpus.travels, &query.predicate);

        self.sessions
            .get_mut(id)?
            .populate(query, aggregation, travels);
        self.rebuild_segments();

        let session = self.sessions.get(id)?;
        let summary = FilterSummary {
            session: id,
            generation,
            cities: session.cities().len(),
            segments: session.segments().len(),
            entries: session.entry_count(),
        };
        info!(
            "[TrailEngine] Filter {}: {} cities, {} segments, {} entries",
            id, summary.cities, summary.segments, summary.entries
        );
        Ok(summary)
    }

    /// Re-run the session's query and schedule its segments as a trail.
    ///
    /// Layers hidden through the toggles stay hidden.
    pub fn animate(&mut self, id: SessionId) -> Result<RevealPlan> {
        let session = self.sessions.get(id)?;
        let query = session.query().clone();
        let visibility = session
            .is_populated()
            .then(|| (session.travels_visible(), session.cities_visible()));
        self.filter(id, query)?;

        let session = self.sessions.get_mut(id)?;
        if let Some((travels, cities)) = visibility {
            session.set_visibility(travels, cities);
        }
        let plan = plan_reveals(session.segments().as_slice(), &self.config.animation());
        let generation = session.generation();

        for step in &plan.steps {
            let Some(segment) = session.segments().as_slice().get(step.segment) else {
                continue;
            };
            self.timers.schedule(
                id,
                step.delay_ms,
                TimerTask::Reveal {
                    generation,
                    step: *step,
                    segment: segment.clone(),
                },
            );
        }

        if plan.is_empty() {
            session.set_state(AnimationState::Finished);
        } else {
            self.timers
                .schedule(id, plan.finish_ms, TimerTask::Finish { generation });
            session.set_state(AnimationState::Scheduled);
        }

        info!(
            "[TrailEngine] Animating {}: {} reveals over {:.0} ms",
            id,
            plan.len(),
            plan.finish_ms
        );
        Ok(plan)
    }

    /// Stop a running animation. Fragments already revealed stay on the map.
    pub fn stop(&mut self, id: SessionId) -> Result<()> {
        self.cancel(id)?;
        info!("[TrailEngine] Stopped {}", id);
        Ok(())
    }

    /// Forget a session's query and everything it showed.
    pub fn clear(&mut self, id: SessionId) -> Result<()> {
        self.cancel(id)?;
        self.sessions.get_mut(id)?.reset();
        self.rebuild_segments();
        info!("[TrailEngine] Cleared {}", id);
        Ok(())
    }

    /// Show or hide a session's travels. Returns the new visibility.
    pub fn toggle_travels(&mut self, id: SessionId) -> Result<bool> {
        Ok(self.sessions.get_mut(id)?.toggle_travels())
    }

    /// Show or hide a session's cities. Returns the new visibility.
    pub fn toggle_cities(&mut self, id: SessionId) -> Result<bool> {
        Ok(self.sessions.get_mut(id)?.toggle_cities())
    }

    // ========================================================================
    // Display
    // ========================================================================

    /// Apply the draw-speed slider. Takes effect on the next animation.
    pub fn set_draw_speed(&mut self, slider: f64) -> Result<()> {
        self.config.set_draw_speed(slider)?;
        info!(
            "[TrailEngine] Draw speed set to {:.3} points/ms",
            self.config.points_per_ms
        );
        Ok(())
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Change the map zoom and rebuild every session's segments.
    pub fn set_zoom(&mut self, zoom: f64) -> Result<()> {
        if !(zoom.is_finite() && zoom > 0.0) {
            return Err(TrailError::InvalidQuery {
                field: "zoom".to_string(),
                value: zoom.to_string(),
            });
        }
        self.zoom = zoom;
        self.rebuild_segments();
        debug!("[TrailEngine] Zoom set to {}", zoom);
        Ok(())
    }

    /// Citations shown by all sessions together.
    pub fn total_entries(&self) -> usize {
        self.sessions.total_entries()
    }

    /// Marker width of a city with `count` citations.
    pub fn city_width(&self, count: usize) -> f64 {
        marker_width(count, self.total_entries(), &self.config)
    }

    /// Stroke width of a travel with `count` citations.
    pub fn travel_width(&self, count: usize) -> f64 {
        stroke_width(count, self.total_entries(), &self.config)
    }

    /// True if a city marker is large enough to show at the current zoom.
    pub fn is_city_visible(&self, city: &CityAggregate) -> bool {
        ZoomVisibility::new(self.zoom, self.config.zoom_threshold)
            .is_visible(self.city_width(city.occurrence_count()))
    }

    /// Features a session currently shows.
    pub fn features(&self, id: SessionId) -> Result<Vec<Feature>> {
        Ok(self.sessions.get(id)?.features())
    }

    /// City marker of a session under a map position.
    pub fn city_at(
        &self,
        id: SessionId,
        at: Coordinate,
        radius_degrees: f64,
    ) -> Result<Option<&CityAggregate>> {
        Ok(self.sessions.get(id)?.city_at(at, radius_degrees))
    }

    fn rebuild_segments(&mut self) {
        let total = self.sessions.total_entries();
        let visibility = ZoomVisibility::new(self.zoom, self.config.zoom_threshold);
        let config = &self.config;
        let geometry = &*self.geometry;
        let is_visible =
            |city: &CityAggregate| visibility.is_visible(marker_width(city.occurrence_count(), total, config));

        for id in self.sessions.ids() {
            let Ok(session) = self.sessions.get_mut(id) else {
                continue;
            };
            let table = if session.travels().is_empty() {
                build_segments(
                    session.events(),
                    session.cities(),
                    is_visible,
                    geometry,
                    config.points_per_arc,
                )
            } else {
                segments_from_travels(session.travels(), geometry, config.points_per_arc)
            };
            session.set_segments(table);
        }
    }

    // ========================================================================
    // Clock
    // ========================================================================

    /// Advance the virtual clock and return the reveals that came due.
    ///
    /// Reveals scheduled under an older generation of their session are
    /// dropped.
    pub fn advance(&mut self, elapsed_ms: f64) -> Vec<Reveal> {
        let fired = self.timers.advance(elapsed_ms);
        self.apply(fired)
    }

    /// Move the virtual clock to an absolute time (never backwards).
    pub fn advance_to(&mut self, now_ms: f64) -> Vec<Reveal> {
        let fired = self.timers.advance_to(now_ms);
        self.apply(fired)
    }

    /// Current virtual time.
    pub fn now_ms(&self) -> f64 {
        self.timers.now_ms()
    }

    /// Virtual time of the next pending task.
    pub fn next_deadline(&self) -> Option<f64> {
        self.timers.next_deadline()
    }

    /// Number of tasks pending for a session.
    pub fn pending(&self, id: SessionId) -> usize {
        self.timers.pending(id)
    }

    fn apply(&mut self, fired: Vec<Fired<TimerTask>>) -> Vec<Reveal> {
        let mut reveals = Vec::new();

        for Fired { session: id, task, .. } in fired {
            let Ok(session) = self.sessions.get_mut(id) else {
                debug!("[TrailEngine] Dropping task of removed session {}", id);
                continue;
            };
            match task {
                TimerTask::Reveal {
                    generation,
                    step,
                    segment,
                } => {
                    if !session.accepts(generation) {
                        debug!(
                            "[TrailEngine] Dropping stale reveal of {} (generation {} != {})",
                            id,
                            generation,
                            session.generation()
                        );
                        continue;
                    }
                    session.mark_revealed();
                    reveals.push(Reveal {
                        session: id,
                        generation,
                        segment_index: step.segment,
                        fragment_index: step.fragment,
                        delay_ms: step.delay_ms,
                        draw_ms: step.draw_ms,
                        color: session.color,
                        segment,
                    });
                }
                TimerTask::Finish { generation } => {
                    if session.accepts(generation) {
                        session.set_state(AnimationState::Finished);
                        info!("[TrailEngine] Animation of {} finished", id);
                    }
                }
            }
        }

        reveals
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    /// Get engine statistics.
    pub fn stats(&self) -> EngineStats {
        let ids = self.sessions.ids();
        let (cities, segments) = ids
            .iter()
            .filter_map(|&id| self.sessions.get(id).ok())
            .fold((0, 0), |(c, s), session| {
                (c + session.cities().len(), s + session.segments().len())
            });
        EngineStats {
            session_count: ids.len() as u32,
            mention_count: self.corpus.mentions.len() as u32,
            travel_count: self.corpus.travels.len() as u32,
            city_count: cities as u32,
            segment_count: segments as u32,
            entry_count: self.total_entries() as u32,
            pending_tasks: self.timers.len() as u32,
            zoom: self.zoom,
        }
    }
}

impl Default for TrailEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine statistics for monitoring.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct EngineStats {
    pub session_count: u32,
    pub mention_count: u32,
    pub travel_count: u32,
    pub city_count: u32,
    pub segment_count: u32,
    pub entry_count: u32,
    pub pending_tasks: u32,
    pub zoom: f64,
}

// ============================================================================
// Global Singleton
// ============================================================================

/// Global engine instance.
///
/// This singleton lets FFI calls share one engine without passing state
/// across the FFI boundary.
pub static ENGINE: Lazy<Mutex<TrailEngine>> = Lazy::new(|| Mutex::new(TrailEngine::new()));

/// Get a lock on the global engine.
pub fn with_engine<F, R>(f: F) -> R
where
    F: FnOnce(&mut TrailEngine) -> R,
{
    // A panic while holding the lock leaves the engine usable
    let mut engine = ENGINE.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut engine)
}

// ============================================================================
// FFI Exports
// ============================================================================

#[cfg(feature = "ffi")]
pub mod engine_ffi {
    use super::*;
    use crate::filter::FilterPredicate;
    use log::warn;

    fn to_json<T: Serialize>(value: &T, fallback: &str) -> String {
        serde_json::to_string(value).unwrap_or_else(|_| fallback.to_string())
    }

    /// Initialize the engine (call once at app startup).
    #[uniffi::export]
    pub fn engine_init() {
        crate::init_logging();
        info!("[TrailEngine] Initialized");
    }

    /// Load the corpus JSON resource. Returns false if it could not be parsed.
    #[uniffi::export]
    pub fn engine_load_corpus(json: String) -> bool {
        match with_engine(|e| e.load_corpus_json(&json)) {
            Ok(_) => true,
            Err(e) => {
                warn!("[TrailEngine] Failed to load corpus: {}", e);
                false
            }
        }
    }

    /// Open a filter panel and return its id.
    #[uniffi::export]
    pub fn engine_add_filter() -> u32 {
        with_engine(|e| e.add_filter().0)
    }

    /// Close a filter panel.
    #[uniffi::export]
    pub fn engine_remove_filter(session: u32) -> bool {
        with_engine(|e| e.remove_filter(SessionId(session)).is_ok())
    }

    /// Apply the filter form of a panel. Empty fields do not restrict.
    /// Returns the filter summary as JSON, or an empty string on error.
    #[uniffi::export]
    pub fn engine_filter(
        session: u32,
        author: String,
        title: String,
        year_begin: String,
        year_end: String,
    ) -> String {
        let result = FilterPredicate::from_form(&author, &title, &year_begin, &year_end)
            .and_then(|p| with_engine(|e| e.filter(SessionId(session), FilterQuery::new(p))));
        match result {
            Ok(summary) => to_json(&summary, ""),
            Err(e) => {
                warn!("[TrailEngine] Filter {} failed: {}", session, e);
                String::new()
            }
        }
    }

    /// Start the animation of a panel. Returns the reveal plan as JSON.
    #[uniffi::export]
    pub fn engine_animate(session: u32) -> String {
        match with_engine(|e| e.animate(SessionId(session))) {
            Ok(plan) => to_json(&plan, "{}"),
            Err(e) => {
                warn!("[TrailEngine] Animate {} failed: {}", session, e);
                String::new()
            }
        }
    }

    #[uniffi::export]
    pub fn engine_stop(session: u32) -> bool {
        with_engine(|e| e.stop(SessionId(session)).is_ok())
    }

    #[uniffi::export]
    pub fn engine_clear(session: u32) -> bool {
        with_engine(|e| e.clear(SessionId(session)).is_ok())
    }

    #[uniffi::export]
    pub fn engine_toggle_travels(session: u32) -> bool {
        with_engine(|e| e.toggle_travels(SessionId(session)).unwrap_or(false))
    }

    #[uniffi::export]
    pub fn engine_toggle_cities(session: u32) -> bool {
        with_engine(|e| e.toggle_cities(SessionId(session)).unwrap_or(false))
    }

    /// Apply the draw-speed slider value.
    #[uniffi::export]
    pub fn engine_set_draw_speed(slider: f64) -> bool {
        with_engine(|e| e.set_draw_speed(slider).is_ok())
    }

    #[uniffi::export]
    pub fn engine_set_zoom(zoom: f64) -> bool {
        with_engine(|e| e.set_zoom(zoom).is_ok())
    }

    /// Advance the clock. Returns the due reveals as a JSON array.
    #[uniffi::export]
    pub fn engine_advance(elapsed_ms: f64) -> String {
        let reveals = with_engine(|e| e.advance(elapsed_ms));
        to_json(&reveals, "[]")
    }

    /// Features shown by a panel as a JSON array.
    #[uniffi::export]
    pub fn engine_get_features_json(session: u32) -> String {
        let features = with_engine(|e| e.features(SessionId(session)).unwrap_or_default());
        to_json(&features, "[]")
    }

    /// Marker width of a city with `count` citations.
    #[uniffi::export]
    pub fn engine_city_width(count: u32) -> f64 {
        with_engine(|e| e.city_width(count as usize))
    }

    /// Stroke width of a travel with `count` citations.
    #[uniffi::export]
    pub fn engine_travel_width(count: u32) -> f64 {
        with_engine(|e| e.travel_width(count as usize))
    }

    /// Label of the city under a map position, or an empty string.
    #[uniffi::export]
    pub fn engine_city_at(session: u32, lat: f64, lng: f64, radius_degrees: f64) -> String {
        with_engine(|e| {
            e.city_at(SessionId(session), Coordinate::new(lat, lng), radius_degrees)
                .ok()
                .flatten()
                .map(CityAggregate::label)
                .unwrap_or_default()
        })
    }

    /// Get engine statistics.
    #[uniffi::export]
    pub fn engine_get_stats() -> EngineStats {
        with_engine(|e| e.stats())
    }
}

// ============================================================================
// Tests
// ============================================================================
