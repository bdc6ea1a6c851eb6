use crate::model::{ChartData, ChartDataNote};
use fretloop_ports::types::Lane;

const DUMMY_BPM: f64 = 120.0;
const BEAT_MS: f64 = 60_000.0 / DUMMY_BPM;

/// Two bars of quarter notes climbing across all four strings, looped.
pub fn dummy_chart() -> ChartData {
    let pattern: [(Lane, f64); 8] = [
        (Lane::E, 0.0),
        (Lane::E, 3.0),
        (Lane::A, 0.0),
        (Lane::A, 2.0),
        (Lane::D, 0.0),
        (Lane::D, 2.0),
        (Lane::G, 0.0),
        (Lane::G, 2.0),
    ];

    let notes = pattern
        .iter()
        .enumerate()
        .map(|(beat, &(lane, fret))| ChartDataNote {
            lane,
            time_ms: beat as f64 * BEAT_MS,
            duration_ms: BEAT_MS * 0.5,
            fret: Some(fret),
        })
        .collect();

    ChartData {
        title: Some("Open string warm-up".to_string()),
        bpm: Some(DUMMY_BPM),
        loop_duration_ms: Some(pattern.len() as f64 * BEAT_MS),
        notes,
    }
}
