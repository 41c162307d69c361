//! Integration tests for reveal planning and the timer queue

use travel_trails::{
    draw_progress, plan_reveals, segments_from_travels, AnimationConfig, Coordinate, CorpusEntry,
    GreatCircle, SessionId, TimerQueue, TravelRecord, TravelSegment,
};

fn travel(from: (f64, f64), to: (f64, f64), desc: &str) -> TravelRecord {
    TravelRecord {
        from: Coordinate::new(from.0, from.1),
        to: Coordinate::new(to.0, to.1),
        description: desc.to_string(),
        entries: vec![CorpusEntry::new("Smith", "Letters", 1800, "")],
    }
}

fn europe() -> Vec<TravelSegment> {
    let travels = vec![
        travel((48.85, 2.35), (41.90, 12.49), "Paris-Rome"),
        travel((41.90, 12.49), (52.52, 13.40), "Rome-Berlin"),
        travel((52.52, 13.40), (59.33, 18.07), "Berlin-Stockholm"),
        travel((59.33, 18.07), (40.42, -3.70), "Stockholm-Madrid"),
    ];
    segments_from_travels(&travels, &GreatCircle, 100)
        .as_slice()
        .to_vec()
}

#[test]
fn test_delays_are_uniform() {
    let config = AnimationConfig::new(0.5, 100);
    let segments = europe();
    let plan = plan_reveals(&segments, &config);

    assert_eq!(plan.len(), 4);
    for (i, step) in plan.steps.iter().enumerate() {
        assert_eq!(step.segment, i);
        assert_eq!(step.delay_ms, i as f64 * config.delay_between_units());
    }
    for pair in plan.steps.windows(2) {
        assert_eq!(pair[1].delay_ms - pair[0].delay_ms, 200.0);
    }
    assert_eq!(plan.finish_ms, 800.0);
}

#[test]
fn test_split_arc_shares_one_slot() {
    let travels = vec![
        travel((48.85, 2.35), (41.90, 12.49), "Paris-Rome"),
        travel((35.68, 139.69), (37.77, -122.42), "Tokyo-San Francisco"),
        travel((52.52, 13.40), (59.33, 18.07), "Berlin-Stockholm"),
    ];
    let segments = segments_from_travels(&travels, &GreatCircle, 100);
    let config = AnimationConfig::new(0.5, 100);
    let plan = plan_reveals(segments.as_slice(), &config);

    assert_eq!(plan.len(), 4);
    assert_eq!(plan.steps[0].delay_ms, 0.0);
    assert_eq!(plan.steps[1].delay_ms, 200.0);
    // The second piece starts when the first piece is drawn
    assert_eq!(plan.steps[2].delay_ms, plan.steps[1].end_ms());
    // The trail continues in the next slot
    assert_eq!(plan.steps[3].delay_ms, 400.0);
}

#[test]
fn test_delays_never_decrease_with_split_arcs() {
    let travels = vec![
        travel((35.68, 139.69), (37.77, -122.42), "Tokyo-San Francisco"),
        travel((-33.87, 151.21), (-17.53, -149.57), "Sydney-Papeete"),
        travel((48.85, 2.35), (41.90, 12.49), "Paris-Rome"),
    ];
    let segments = segments_from_travels(&travels, &GreatCircle, 100);
    let plan = plan_reveals(segments.as_slice(), &AnimationConfig::new(0.3, 100));
    assert!(plan
        .steps
        .windows(2)
        .all(|pair| pair[0].delay_ms <= pair[1].delay_ms));
}

#[test]
fn test_draw_progress_reaches_full_length() {
    let config = AnimationConfig::new(0.5, 100);
    let full = config.draw_duration(100);
    assert!(!draw_progress(100, full / 2.0, 0.5).finished);
    let done = draw_progress(100, full, 0.5);
    assert!(done.finished);
    assert_eq!(done.points, 100);
}

#[test]
fn test_cancelled_session_never_fires() {
    let mut timers = TimerQueue::new();
    let first = SessionId(0);
    let second = SessionId(1);
    for i in 0..5 {
        timers.schedule(first, i as f64 * 100.0, i);
        timers.schedule(second, i as f64 * 100.0, 10 + i);
    }
    timers.advance(150.0);
    assert_eq!(timers.cancel_all(first), 3);

    let fired = timers.advance(1000.0);
    assert!(fired.iter().all(|f| f.session == second));
    assert_eq!(fired.len(), 3);
    let deadlines: Vec<f64> = fired.iter().map(|f| f.deadline_ms).collect();
    assert_eq!(deadlines, vec![200.0, 300.0, 400.0]);
}
