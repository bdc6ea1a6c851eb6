use fretloop_domain_chart::{
    dummy_chart, resolve_open_string_midi_by_lane, ChartData, ChartDataNote, LaneChart,
    LaneChartNote, OpenStringTuning, TuningOverrides,
};
use fretloop_domain_eval::{
    chart_data_to_scoring_chart, lane_chart_to_scoring_chart, normalize_chart,
    LoopScoringChartInput, ScoringError, ScoringNoteInput,
};
use fretloop_ports::types::Lane;
use pretty_assertions::assert_eq;

fn chart_note(lane: Lane, time_ms: f64, fret: Option<f64>) -> ChartDataNote {
    ChartDataNote {
        lane,
        time_ms,
        duration_ms: 250.0,
        fret,
    }
}

#[test]
fn chart_data_resolves_targets_and_ids() {
    let chart = ChartData {
        title: Some("riff".to_string()),
        bpm: None,
        loop_duration_ms: None,
        notes: vec![
            chart_note(Lane::A, 500.0, Some(3.0)),
            chart_note(Lane::E, 1200.4, Some(0.0)),
        ],
    };

    let input =
        chart_data_to_scoring_chart(&chart, &OpenStringTuning::default()).expect("valid chart");

    assert_eq!(input.loop_duration_ms, 1451.0);
    assert_eq!(
        input.notes[0],
        ScoringNoteInput {
            id: Some("chart-0".to_string()),
            lane: Lane::A,
            time_ms: 500.0,
            duration_ms: 250.0,
            fret: Some(3.0),
            target_midi_note: 36.0,
        }
    );
    assert_eq!(input.notes[1].id.as_deref(), Some("chart-1"));
    assert_eq!(input.notes[1].target_midi_note, 28.0);

    let normalized = normalize_chart(&input).expect("valid input");
    assert_eq!(normalized.notes[0].target_cents, 3600.0);
}

#[test]
fn chart_data_requires_a_fret() {
    let chart = ChartData {
        title: None,
        bpm: None,
        loop_duration_ms: Some(1000.0),
        notes: vec![chart_note(Lane::D, 0.0, None)],
    };
    let err = chart_data_to_scoring_chart(&chart, &OpenStringTuning::default()).unwrap_err();
    assert!(matches!(err, ScoringError::InvalidChart(_)));
    assert!(err.to_string().contains("notes[0].fret"));

    let chart = ChartData {
        notes: vec![chart_note(Lane::D, 0.0, Some(f64::INFINITY))],
        ..chart
    };
    assert!(chart_data_to_scoring_chart(&chart, &OpenStringTuning::default()).is_err());
}

#[test]
fn explicit_loop_duration_must_be_positive() {
    let chart = ChartData {
        title: None,
        bpm: None,
        loop_duration_ms: Some(0.0),
        notes: Vec::new(),
    };
    assert!(chart_data_to_scoring_chart(&chart, &OpenStringTuning::default()).is_err());
    assert!(lane_chart_to_scoring_chart(&chart, &OpenStringTuning::default()).is_err());
}

#[test]
fn lane_chart_requires_explicit_loop_duration() {
    let chart = ChartData {
        title: None,
        bpm: None,
        loop_duration_ms: None,
        notes: vec![chart_note(Lane::G, 0.0, Some(1.0))],
    };
    let err = lane_chart_to_scoring_chart(&chart, &OpenStringTuning::default()).unwrap_err();
    assert!(err.to_string().contains("loopDurationMs"));
}

#[test]
fn lane_chart_uses_lane_ids_and_custom_tuning() {
    let chart = LaneChart {
        track_index: 2,
        track_name: "Bass".to_string(),
        bpm: 96.0,
        loop_duration_ms: 3000,
        notes: vec![LaneChartNote {
            lane: Lane::E,
            fret: 2,
            midi_note: 28,
            time_ms: 2500,
            duration_ms: 500,
        }],
    };
    let tuning = resolve_open_string_midi_by_lane(&TuningOverrides {
        e: Some(26.0),
        ..TuningOverrides::default()
    })
    .expect("finite tuning");

    let input = lane_chart_to_scoring_chart(&chart, &tuning).expect("valid chart");

    assert_eq!(input.loop_duration_ms, 3000.0);
    assert_eq!(input.notes[0].id.as_deref(), Some("lane-0"));
    assert_eq!(input.notes[0].target_midi_note, 28.0);
    assert_eq!(input.notes[0].time_ms, 2500.0);
}

#[test]
fn dummy_chart_adapts_cleanly() {
    let input =
        chart_data_to_scoring_chart(&dummy_chart(), &OpenStringTuning::default()).expect("valid");
    assert_eq!(input.loop_duration_ms, 4000.0);
    assert_eq!(input.notes.len(), 8);
}

#[test]
fn normalization_wraps_and_orders_notes() {
    let input = LoopScoringChartInput {
        loop_duration_ms: 1000.0,
        notes: vec![
            ScoringNoteInput {
                id: None,
                lane: Lane::E,
                time_ms: 1250.0,
                duration_ms: 10.0,
                fret: None,
                target_midi_note: 28.0,
            },
            ScoringNoteInput {
                id: Some("kept".to_string()),
                lane: Lane::A,
                time_ms: 250.0,
                duration_ms: 10.0,
                fret: Some(0.0),
                target_midi_note: 33.0,
            },
            ScoringNoteInput {
                id: None,
                lane: Lane::G,
                time_ms: -100.0,
                duration_ms: 0.0,
                fret: None,
                target_midi_note: 43.0,
            },
        ],
    };

    let chart = normalize_chart(&input).expect("valid input");
    let order: Vec<(f64, usize, &str)> = chart
        .notes
        .iter()
        .map(|note| (note.time_ms, note.source_order, note.id.as_str()))
        .collect();
    assert_eq!(
        order,
        vec![(250.0, 0, "note-0"), (250.0, 1, "kept"), (900.0, 2, "note-2")]
    );
    assert!(chart.notes.windows(2).all(|pair| {
        (pair[0].time_ms, pair[0].source_order) <= (pair[1].time_ms, pair[1].source_order)
    }));
}

#[test]
fn normalization_rejects_bad_note_fields() {
    let mut input = LoopScoringChartInput {
        loop_duration_ms: 1000.0,
        notes: vec![ScoringNoteInput {
            id: None,
            lane: Lane::E,
            time_ms: 0.0,
            duration_ms: -1.0,
            fret: None,
            target_midi_note: 28.0,
        }],
    };
    let err = normalize_chart(&input).unwrap_err();
    assert!(err.to_string().contains("notes[0].durationMs"));

    input.notes[0].duration_ms = 1.0;
    input.notes[0].target_midi_note = f64::NAN;
    let err = normalize_chart(&input).unwrap_err();
    assert!(err.to_string().contains("targetMidiNote"));
}
