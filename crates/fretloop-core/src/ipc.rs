use crate::transport::TransportState;
use fretloop_domain_eval::{ScoringEvent, ScoringStatsSnapshot};
use fretloop_ports::storage::SettingsDto;
use fretloop_ports::types::TimeMs;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ChartSource {
    Dummy,
    SmfTrack { index: usize, name: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Command {
    LoadDummyChart,
    ImportSmf { bytes: Vec<u8> },
    SelectTrack { index: i64 },
    SetMaxFret { max_fret: Option<u32> },
    SetLatencyOffsetMs { ms: i32 },
    SetMinConfidence { value: f64 },
    StartPractice,
    PausePractice,
    StopPractice,
    Seek { display_ms: TimeMs },
    ResetStats,
    ExportDiagnostics { path: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Ready,
    Running,
    Paused,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub index: usize,
    pub name: String,
    pub note_count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    SessionStateUpdated {
        state: SessionState,
        transport: TransportState,
        settings: SettingsDto,
    },
    SmfTracksUpdated {
        bpm: f64,
        tracks: Vec<TrackSummary>,
    },
    ChartLoaded {
        source: ChartSource,
        loop_duration_ms: TimeMs,
        note_count: usize,
    },
    Scoring {
        event: ScoringEvent,
    },
    StatsUpdated {
        stats: ScoringStatsSnapshot,
    },
}
