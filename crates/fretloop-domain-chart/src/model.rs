use fretloop_ports::types::{Lane, TimeMs};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BPM: f64 = 120.0;

/// Flat chart as authored by hand or shipped with the app.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub title: Option<String>,
    pub bpm: Option<f64>,
    pub loop_duration_ms: Option<TimeMs>,
    pub notes: Vec<ChartDataNote>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartDataNote {
    pub lane: Lane,
    pub time_ms: TimeMs,
    pub duration_ms: TimeMs,
    pub fret: Option<f64>,
}

/// Result of mapping one SMF track onto the four lanes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaneChart {
    pub track_index: usize,
    pub track_name: String,
    pub bpm: f64,
    pub loop_duration_ms: u64,
    pub notes: Vec<LaneChartNote>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneChartNote {
    pub lane: Lane,
    pub fret: u32,
    pub midi_note: u8,
    pub time_ms: u64,
    pub duration_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParsedSmf {
    pub bpm: f64,
    pub ppq: u16,
    pub tracks: Vec<SmfTrack>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SmfTrack {
    pub index: usize,
    pub name: String,
    pub channel: Option<u8>,
    pub notes: Vec<SmfNote>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmfNote {
    pub midi_note: u8,
    pub time_ms: u64,
    pub duration_ms: u64,
    pub velocity: u8,
}

/// Lane-level view of a chart note, independent of where the chart came from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChartNoteView {
    pub lane: Lane,
    pub time_ms: TimeMs,
    pub duration_ms: TimeMs,
    pub fret: Option<f64>,
}

/// Anything that exposes lane notes and, optionally, its own loop length.
pub trait ChartLike {
    fn loop_duration_ms(&self) -> Option<TimeMs>;
    fn note_views(&self) -> Vec<ChartNoteView>;
}

impl ChartLike for ChartData {
    fn loop_duration_ms(&self) -> Option<TimeMs> {
        self.loop_duration_ms
    }

    fn note_views(&self) -> Vec<ChartNoteView> {
        self.notes
            .iter()
            .map(|note| ChartNoteView {
                lane: note.lane,
                time_ms: note.time_ms,
                duration_ms: note.duration_ms,
                fret: note.fret,
            })
            .collect()
    }
}

impl ChartLike for LaneChart {
    fn loop_duration_ms(&self) -> Option<TimeMs> {
        Some(self.loop_duration_ms as TimeMs)
    }

    fn note_views(&self) -> Vec<ChartNoteView> {
        self.notes
            .iter()
            .map(|note| ChartNoteView {
                lane: note.lane,
                time_ms: note.time_ms as TimeMs,
                duration_ms: note.duration_ms as TimeMs,
                fret: Some(note.fret as f64),
            })
            .collect()
    }
}

/// Smallest whole-millisecond loop that covers the end of every note, never below 1.
pub fn derive_loop_duration_ms<I>(spans: I) -> TimeMs
where
    I: IntoIterator<Item = (TimeMs, TimeMs)>,
{
    let latest_end = spans
        .into_iter()
        .map(|(time_ms, duration_ms)| time_ms.max(0.0) + duration_ms.max(0.0))
        .fold(0.0_f64, f64::max);
    latest_end.ceil().max(1.0)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneChartSummary {
    pub notes_per_lane: [usize; 4],
    pub highest_fret: Option<u32>,
}

pub fn lane_chart_summary(chart: &LaneChart) -> LaneChartSummary {
    let mut summary = LaneChartSummary::default();
    for note in &chart.notes {
        summary.notes_per_lane[note.lane.order_index()] += 1;
        summary.highest_fret = Some(summary.highest_fret.map_or(note.fret, |f| f.max(note.fret)));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_duration_covers_latest_note_end() {
        assert_eq!(derive_loop_duration_ms([(0.0, 500.0), (1200.4, 300.0)]), 1501.0);
    }

    #[test]
    fn loop_duration_ignores_negative_parts_and_has_floor() {
        assert_eq!(derive_loop_duration_ms(Vec::new()), 1.0);
        assert_eq!(derive_loop_duration_ms([(-50.0, -10.0)]), 1.0);
        assert_eq!(derive_loop_duration_ms([(-50.0, 20.0)]), 20.0);
    }
}
