use fretloop_domain_chart::{ChartData, ChartDataNote, OpenStringTuning};
use fretloop_domain_eval::{
    chart_data_to_scoring_chart, EventSource, Judgement, JudgementReason, LoopScoringChartInput,
    LoopScoringEngine, ScoringConfig, ScoringConfigOverrides, ScoringError, ScoringInput,
    ScoringNoteInput, MAX_ELAPSED_LOOPS_PER_SWEEP,
};
use fretloop_ports::types::Lane;
use pretty_assertions::assert_eq;

fn single_e_chart() -> LoopScoringChartInput {
    let chart = ChartData {
        title: None,
        bpm: None,
        loop_duration_ms: Some(2000.0),
        notes: vec![ChartDataNote {
            lane: Lane::E,
            time_ms: 1000.0,
            duration_ms: 120.0,
            fret: Some(0.0),
        }],
    };
    chart_data_to_scoring_chart(&chart, &OpenStringTuning::default()).expect("valid chart")
}

fn note(lane: Lane, time_ms: f64, target_midi_note: f64) -> ScoringNoteInput {
    ScoringNoteInput {
        id: None,
        lane,
        time_ms,
        duration_ms: 100.0,
        fret: None,
        target_midi_note,
    }
}

fn engine_for(chart: &LoopScoringChartInput) -> LoopScoringEngine {
    LoopScoringEngine::new(chart, ScoringConfig::default()).expect("valid engine")
}

fn heard(evaluated_at_ms: f64, pitch_cents: f64, lane: Option<Lane>) -> ScoringInput {
    ScoringInput {
        evaluated_at_ms,
        pitch_cents: Some(pitch_cents),
        lane,
    }
}

#[test]
fn perfect_good_and_pitch_miss_across_loops() {
    let mut engine = engine_for(&single_e_chart());

    let events = engine
        .evaluate(heard(1000.0, 2800.0, Some(Lane::E)))
        .expect("finite input");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].judgement, Judgement::Perfect);
    assert_eq!(events[0].reason, JudgementReason::PerfectWindow);
    assert_eq!(events[0].source, EventSource::Input);
    assert_eq!(events[0].note.loop_index, 0);
    assert_eq!(events[0].note.note_id, "chart-0");

    let events = engine
        .evaluate(heard(3000.0, 2825.0, Some(Lane::E)))
        .expect("finite input");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].judgement, Judgement::Good);
    assert_eq!(events[0].reason, JudgementReason::GoodWindow);
    assert_eq!(events[0].timing_error_ms, Some(0.0));
    assert_eq!(events[0].pitch_error_cents, Some(25.0));
    assert_eq!(events[0].note.loop_index, 1);
    assert_eq!(events[0].note.occurrence_time_ms, 3000.0);

    let events = engine
        .evaluate(heard(5000.0, 2860.0, Some(Lane::E)))
        .expect("finite input");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].judgement, Judgement::Miss);
    assert_eq!(events[0].reason, JudgementReason::PitchWindow);
    assert_eq!(events[0].pitch_error_cents, Some(60.0));

    let stats = engine.stats();
    assert_eq!(
        (stats.perfect, stats.good, stats.miss, stats.total),
        (1, 1, 1, 3)
    );
    assert_eq!(stats.accuracy, 0.5);
}

#[test]
fn advance_retires_every_elapsed_occurrence() {
    let mut engine = engine_for(&single_e_chart());

    let events = engine.advance(7200.0).expect("finite time");

    let loops: Vec<u64> = events.iter().map(|event| event.note.loop_index).collect();
    assert_eq!(loops, vec![0, 1, 2, 3]);
    assert!(events.iter().all(|event| event.source == EventSource::AutoMiss
        && event.judgement == Judgement::Miss
        && event.reason == JudgementReason::WindowElapsed
        && event.pitch_error_cents.is_none()));
    assert_eq!(events[3].note.occurrence_time_ms, 7000.0);
    assert_eq!(events[3].timing_error_ms, Some(200.0));
    assert_eq!(engine.next_loop_index(0), Some(4));
    assert_eq!(engine.stats().miss, 4);

    assert!(engine.advance(7200.0).expect("finite time").is_empty());
}

#[test]
fn occurrence_exactly_at_threshold_is_missed() {
    let mut engine = engine_for(&single_e_chart());
    assert!(engine.advance(1079.0).expect("finite time").is_empty());
    let events = engine.advance(1080.0).expect("finite time");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].note.loop_index, 0);
}

#[test]
fn auto_misses_precede_the_input_judgement() {
    let mut engine = engine_for(&single_e_chart());

    let events = engine
        .evaluate(heard(3010.0, 2800.0, None))
        .expect("finite input");

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].source, EventSource::AutoMiss);
    assert_eq!(events[0].note.loop_index, 0);
    assert_eq!(events[1].source, EventSource::Input);
    assert_eq!(events[1].judgement, Judgement::Perfect);
    assert_eq!(events[1].note.loop_index, 1);
    assert_eq!(events[1].timing_error_ms, Some(10.0));
}

#[test]
fn latency_offset_shifts_the_evaluation_point() {
    let cfg = ScoringConfig::new(&ScoringConfigOverrides {
        latency_offset_ms: Some(-60.0),
        ..ScoringConfigOverrides::default()
    })
    .expect("valid config");
    let mut engine = LoopScoringEngine::new(&single_e_chart(), cfg).expect("valid engine");

    let events = engine
        .evaluate(heard(1060.0, 2800.0, Some(Lane::E)))
        .expect("finite input");
    assert_eq!(events[0].evaluated_at_ms, 1060.0);
    assert_eq!(events[0].adjusted_time_ms, 1000.0);
    assert_eq!(events[0].timing_error_ms, Some(0.0));
    assert_eq!(events[0].judgement, Judgement::Perfect);
}

#[test]
fn missing_pitch_consumes_the_occurrence() {
    let mut engine = engine_for(&single_e_chart());

    let events = engine
        .evaluate(ScoringInput {
            evaluated_at_ms: 1020.0,
            pitch_cents: None,
            lane: Some(Lane::E),
        })
        .expect("finite input");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].judgement, Judgement::Miss);
    assert_eq!(events[0].reason, JudgementReason::PitchMissing);
    assert_eq!(events[0].timing_error_ms, Some(20.0));
    assert_eq!(events[0].pitch_error_cents, None);

    // Same occurrence cannot be judged twice.
    let events = engine
        .evaluate(heard(1030.0, 2800.0, Some(Lane::E)))
        .expect("finite input");
    assert!(events.is_empty());

    let events = engine
        .evaluate(ScoringInput {
            evaluated_at_ms: 3000.0,
            pitch_cents: Some(f64::NAN),
            lane: None,
        })
        .expect("finite input");
    assert_eq!(events[0].reason, JudgementReason::PitchMissing);
}

#[test]
fn timing_outside_perfect_window_is_good() {
    let mut engine = engine_for(&single_e_chart());
    let events = engine
        .evaluate(heard(940.0, 2800.0, None))
        .expect("finite input");
    assert_eq!(events[0].judgement, Judgement::Good);
    assert_eq!(events[0].timing_error_ms, Some(-60.0));
}

#[test]
fn lane_filter_excludes_other_strings() {
    let mut engine = engine_for(&single_e_chart());
    let events = engine
        .evaluate(heard(1000.0, 2800.0, Some(Lane::A)))
        .expect("finite input");
    assert!(events.is_empty());
    assert_eq!(engine.next_loop_index(0), Some(0));
}

#[test]
fn sample_outside_window_matches_nothing() {
    let mut engine = engine_for(&single_e_chart());
    let events = engine
        .evaluate(heard(900.0, 2800.0, None))
        .expect("finite input");
    assert!(events.is_empty());
    assert_eq!(engine.stats().total, 0);
}

#[test]
fn closest_occurrence_wins() {
    let chart = LoopScoringChartInput {
        loop_duration_ms: 4000.0,
        notes: vec![note(Lane::E, 1000.0, 28.0), note(Lane::A, 1050.0, 33.0)],
    };
    let mut engine = engine_for(&chart);
    let events = engine
        .evaluate(heard(1040.0, 3300.0, None))
        .expect("finite input");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].note.lane, Lane::A);
    assert_eq!(events[0].judgement, Judgement::Perfect);
}

#[test]
fn simultaneous_notes_resolve_by_source_order() {
    let chart = LoopScoringChartInput {
        loop_duration_ms: 4000.0,
        notes: vec![note(Lane::D, 500.0, 38.0), note(Lane::A, 500.0, 33.0)],
    };
    let mut engine = engine_for(&chart);

    let first = engine
        .evaluate(heard(500.0, 3800.0, None))
        .expect("finite input");
    assert_eq!(first[0].note.lane, Lane::D);
    assert_eq!(first[0].note.source_order, 0);

    let second = engine
        .evaluate(heard(500.0, 3300.0, None))
        .expect("finite input");
    assert_eq!(second[0].note.lane, Lane::A);
    assert_eq!(second[0].judgement, Judgement::Perfect);
}

#[test]
fn auto_misses_across_notes_are_chronological() {
    let chart = LoopScoringChartInput {
        loop_duration_ms: 1000.0,
        notes: vec![note(Lane::G, 600.0, 43.0), note(Lane::E, 100.0, 28.0)],
    };
    let mut engine = engine_for(&chart);
    let events = engine.advance(1800.0).expect("finite time");
    let occurrences: Vec<f64> = events
        .iter()
        .map(|event| event.note.occurrence_time_ms)
        .collect();
    assert_eq!(occurrences, vec![100.0, 600.0, 1100.0, 1600.0]);
}

#[test]
fn set_chart_is_a_hard_reset() {
    let mut engine = engine_for(&single_e_chart());
    engine.advance(5000.0).expect("finite time");
    assert_eq!(engine.stats().miss, 2);

    let replacement = LoopScoringChartInput {
        loop_duration_ms: 1000.0,
        notes: vec![note(Lane::A, 200.0, 33.0), note(Lane::D, 100.0, 38.0)],
    };
    engine.set_chart(&replacement).expect("valid chart");

    assert_eq!(engine.stats().total, 0);
    assert_eq!(engine.chart().notes.len(), 2);
    assert_eq!(engine.next_loop_index(0), Some(0));
    assert_eq!(engine.next_loop_index(1), Some(0));
}

#[test]
fn invalid_replacement_chart_keeps_previous_state() {
    let mut engine = engine_for(&single_e_chart());
    engine.advance(1100.0).expect("finite time");

    let broken = LoopScoringChartInput {
        loop_duration_ms: 0.0,
        notes: Vec::new(),
    };
    assert!(matches!(
        engine.set_chart(&broken),
        Err(ScoringError::InvalidChart(_))
    ));
    assert_eq!(engine.stats().miss, 1);
    assert_eq!(engine.chart().loop_duration_ms, 2000.0);
}

#[test]
fn reset_rewinds_cursors_but_keeps_chart() {
    let mut engine = engine_for(&single_e_chart());
    engine.advance(3200.0).expect("finite time");
    assert_eq!(engine.next_loop_index(0), Some(2));

    engine.reset_stats();
    assert_eq!(engine.stats().total, 0);
    assert_eq!(engine.next_loop_index(0), Some(2));

    engine.reset();
    assert_eq!(engine.next_loop_index(0), Some(0));
    assert_eq!(engine.chart().notes.len(), 1);
}

#[test]
fn non_finite_timestamps_are_rejected() {
    let mut engine = engine_for(&single_e_chart());
    assert!(matches!(
        engine.evaluate(heard(f64::NAN, 2800.0, None)),
        Err(ScoringError::InvalidInput(_))
    ));
    assert!(matches!(
        engine.advance(f64::INFINITY),
        Err(ScoringError::InvalidInput(_))
    ));
    assert_eq!(engine.next_loop_index(0), Some(0));
}

#[test]
fn huge_time_jumps_are_rejected_without_moving_cursors() {
    let mut engine = engine_for(&single_e_chart());
    let err = engine.advance(f64::MAX).unwrap_err();
    assert!(matches!(err, ScoringError::InvalidInput(_)));
    assert!(err.to_string().contains("too far ahead"));
    assert!(matches!(
        engine.evaluate(heard(1.0e12, 2800.0, None)),
        Err(ScoringError::InvalidInput(_))
    ));
    assert_eq!(engine.next_loop_index(0), Some(0));
    assert_eq!(engine.stats().total, 0);

    // Exactly at the bound the sweep still runs.
    let last_retired_ms = 1000.0 + 2000.0 * (MAX_ELAPSED_LOOPS_PER_SWEEP - 1) as f64;
    let events = engine.advance(last_retired_ms + 80.0).expect("within bound");
    assert_eq!(events.len() as u64, MAX_ELAPSED_LOOPS_PER_SWEEP);
    assert_eq!(engine.next_loop_index(0), Some(MAX_ELAPSED_LOOPS_PER_SWEEP));
}

#[test]
fn config_is_returned_by_value() {
    let mut engine = engine_for(&single_e_chart());
    let mut copy = engine.config();
    copy.timing_window_ms = 1.0;
    assert_ne!(copy, engine.config());
    assert_eq!(engine.config(), ScoringConfig::default());
    assert_eq!(engine.config(), engine.config());

    engine.set_latency_offset_ms(-25.0).expect("finite offset");
    assert_eq!(engine.config().latency_offset_ms, -25.0);
}

#[test]
fn rejected_config_update_leaves_config_untouched() {
    let mut engine = engine_for(&single_e_chart());
    let err = engine
        .update_config(&ScoringConfigOverrides {
            timing_window_ms: Some(30.0),
            ..ScoringConfigOverrides::default()
        })
        .unwrap_err();
    assert!(err.to_string().contains("perfectTimingWindowMs"));
    assert_eq!(engine.config(), ScoringConfig::default());

    assert!(engine.set_latency_offset_ms(f64::NAN).is_err());
}

#[test]
fn engine_rejects_hand_built_invalid_config() {
    let cfg = ScoringConfig {
        pitch_window_cents: -1.0,
        ..ScoringConfig::default()
    };
    assert!(matches!(
        LoopScoringEngine::new(&single_e_chart(), cfg),
        Err(ScoringError::InvalidConfig(_))
    ));
}
