//! Reveal planning for trail animations.
//!
//! Segments are drawn one after another so a session's travels animate as
//! a continuous trail. The n-th arc starts `n * points_per_arc /
//! points_per_ms` milliseconds after the first, which is exactly the time
//! it takes to draw one full arc.
//!
//! An arc split at the antimeridian is one travel drawn as two fragments.
//! The second fragment starts when the first one finishes drawing instead
//! of taking the next slot, otherwise the trail would show a gap and the
//! travel would cost two slots.
//!
//! Fragments that do not say whether they are split pieces are classified
//! by size: anything shorter than `points_per_arc` is taken to be a piece.
//! A fragment that is short for another reason is misclassified by this
//! rule; providers should set [`FragmentKind`] to avoid it.

use serde::Serialize;

use crate::geometry::{ArcFragment, FragmentKind};
use crate::segments::TravelSegment;

/// Draw speed and arc density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationConfig {
    /// Arc points drawn per millisecond
    pub points_per_ms: f64,
    /// Points in a whole arc
    pub points_per_arc: usize,
}

impl AnimationConfig {
    /// Create an animation configuration.
    pub fn new(points_per_ms: f64, points_per_arc: usize) -> Self {
        Self {
            points_per_ms,
            points_per_arc,
        }
    }

    /// Milliseconds between the starts of two consecutive arcs.
    pub fn delay_between_units(&self) -> f64 {
        self.points_per_arc as f64 / self.points_per_ms
    }

    /// Milliseconds needed to draw `points` points.
    pub fn draw_duration(&self, points: usize) -> f64 {
        points as f64 / self.points_per_ms
    }

    fn is_split_piece(&self, fragment: &ArcFragment) -> bool {
        match fragment.kind {
            FragmentKind::SplitPart => true,
            FragmentKind::Whole => false,
            FragmentKind::Unknown => fragment.len() < self.points_per_arc,
        }
    }
}

/// When one fragment appears and how long it takes to draw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RevealStep {
    /// Index of the segment in creation order
    pub segment: usize,
    /// Index of the fragment within the segment
    pub fragment: usize,
    /// Delay from the start of the animation
    pub delay_ms: f64,
    /// Time to draw the fragment once revealed
    pub draw_ms: f64,
}

impl RevealStep {
    /// Time at which the fragment is fully drawn.
    pub fn end_ms(&self) -> f64 {
        self.delay_ms + self.draw_ms
    }
}

/// Reveal schedule of one animation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RevealPlan {
    pub steps: Vec<RevealStep>,
    /// Time at which the last fragment is fully drawn
    pub finish_ms: f64,
}

impl RevealPlan {
    fn from_steps(steps: Vec<RevealStep>) -> Self {
        let finish_ms = steps.iter().map(RevealStep::end_ms).fold(0.0, f64::max);
        Self { steps, finish_ms }
    }

    /// Number of reveal steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True if nothing is revealed.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Schedule the fragments of `segments` as a continuous trail.
pub fn plan_reveals(segments: &[TravelSegment], config: &AnimationConfig) -> RevealPlan {
    let slot = config.delay_between_units();
    let mut steps = Vec::new();
    let mut index = 0usize;
    // Start time of the second piece of a split arc whose first piece was just scheduled
    let mut second_piece_at: Option<f64> = None;

    for (s, segment) in segments.iter().enumerate() {
        for (f, fragment) in segment.fragments.iter().enumerate() {
            let draw_ms = config.draw_duration(fragment.len());
            let delay_ms = if config.is_split_piece(fragment) {
                match second_piece_at.take() {
                    Some(at) => {
                        index += 1;
                        at
                    }
                    None => {
                        let at = index as f64 * slot;
                        second_piece_at = Some(at + draw_ms);
                        at
                    }
                }
            } else {
                // A lone piece still owns its slot
                if second_piece_at.take().is_some() {
                    index += 1;
                }
                let at = index as f64 * slot;
                index += 1;
                at
            };
            steps.push(RevealStep {
                segment: s,
                fragment: f,
                delay_ms,
                draw_ms,
            });
        }
    }

    RevealPlan::from_steps(steps)
}

/// Reveal every fragment immediately, fully drawn (static display).
pub fn instant_plan(segments: &[TravelSegment]) -> RevealPlan {
    let steps = segments
        .iter()
        .enumerate()
        .flat_map(|(s, segment)| {
            (0..segment.fragments.len()).map(move |f| RevealStep {
                segment: s,
                fragment: f,
                delay_ms: 0.0,
                draw_ms: 0.0,
            })
        })
        .collect();
    RevealPlan::from_steps(steps)
}

/// How much of a revealed fragment to draw in the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DrawProgress {
    /// Number of leading points to draw
    pub points: usize,
    /// True once the whole fragment is drawn
    pub finished: bool,
}

/// Progress of a fragment of `len` points, `elapsed_ms` after its reveal.
pub fn draw_progress(len: usize, elapsed_ms: f64, points_per_ms: f64) -> DrawProgress {
    let elapsed_points = (elapsed_ms.max(0.0) * points_per_ms).floor();
    if elapsed_points >= len as f64 {
        DrawProgress {
            points: len,
            finished: true,
        }
    } else {
        DrawProgress {
            points: elapsed_points as usize,
            finished: false,
        }
    }
}

/// Animation lifecycle of a filter session.
///
/// `Idle → Scheduled → Animating → Finished`. Stopping an animation returns
/// to `Idle`; starting a new filter or animation always passes through
/// `Idle` after cancelling outstanding reveals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnimationState {
    /// Nothing pending
    Idle,
    /// Reveals are scheduled, none has fired yet
    Scheduled,
    /// At least one reveal has fired
    Animating,
    /// The last fragment has finished drawing
    Finished,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Coordinate, PairKey};

    fn fragment(len: usize, kind: FragmentKind) -> ArcFragment {
        ArcFragment::new(vec![Coordinate::new(0.0, 0.0); len], kind)
    }

    fn segment(fragments: Vec<ArcFragment>) -> TravelSegment {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(1.0, 1.0);
        TravelSegment {
            key: PairKey::new(a, b),
            from: a,
            to: b,
            description: "A-B".to_string(),
            occurrences: Vec::new(),
            fragments,
        }
    }

    #[test]
    fn test_uniform_delays() {
        let config = AnimationConfig::new(0.5, 100);
        let segments: Vec<TravelSegment> = (0..4)
            .map(|_| segment(vec![fragment(100, FragmentKind::Whole)]))
            .collect();
        let plan = plan_reveals(&segments, &config);
        let delays: Vec<f64> = plan.steps.iter().map(|s| s.delay_ms).collect();
        assert_eq!(delays, vec![0.0, 200.0, 400.0, 600.0]);
        assert_eq!(plan.finish_ms, 800.0);
    }

    #[test]
    fn test_split_arc_second_piece_follows_first() {
        let config = AnimationConfig::new(0.5, 100);
        let segments = vec![
            segment(vec![fragment(100, FragmentKind::Whole)]),
            segment(vec![
                fragment(40, FragmentKind::SplitPart),
                fragment(62, FragmentKind::SplitPart),
            ]),
            segment(vec![fragment(100, FragmentKind::Whole)]),
        ];
        let plan = plan_reveals(&segments, &config);
        let delays: Vec<f64> = plan.steps.iter().map(|s| s.delay_ms).collect();
        // second piece starts when the 40-point piece is drawn (80 ms later)
        assert_eq!(delays, vec![0.0, 200.0, 280.0, 400.0]);
    }

    #[test]
    fn test_unknown_kind_uses_point_count() {
        let config = AnimationConfig::new(0.5, 100);
        let segments = vec![segment(vec![
            fragment(30, FragmentKind::Unknown),
            fragment(70, FragmentKind::Unknown),
        ])];
        let plan = plan_reveals(&segments, &config);
        assert_eq!(plan.steps[1].delay_ms, 60.0);
    }

    #[test]
    fn test_lone_piece_keeps_its_slot() {
        let config = AnimationConfig::new(0.5, 100);
        let segments = vec![
            segment(vec![fragment(30, FragmentKind::SplitPart)]),
            segment(vec![fragment(100, FragmentKind::Whole)]),
        ];
        let plan = plan_reveals(&segments, &config);
        assert_eq!(plan.steps[1].delay_ms, 200.0);
    }

    #[test]
    fn test_empty_plan() {
        let plan = plan_reveals(&[], &AnimationConfig::new(0.3, 100));
        assert!(plan.is_empty());
        assert_eq!(plan.finish_ms, 0.0);
    }

    #[test]
    fn test_instant_plan() {
        let segments = vec![segment(vec![
            fragment(40, FragmentKind::SplitPart),
            fragment(62, FragmentKind::SplitPart),
        ])];
        let plan = instant_plan(&segments);
        assert_eq!(plan.len(), 2);
        assert!(plan.steps.iter().all(|s| s.delay_ms == 0.0));
    }

    #[test]
    fn test_draw_progress() {
        assert_eq!(
            draw_progress(100, 100.0, 0.5),
            DrawProgress {
                points: 50,
                finished: false
            }
        );
        assert!(draw_progress(100, 200.0, 0.5).finished);
        assert_eq!(draw_progress(100, -5.0, 0.3).points, 0);
    }
}
