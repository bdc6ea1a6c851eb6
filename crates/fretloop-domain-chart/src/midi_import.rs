use crate::model::{ParsedSmf, SmfNote, SmfTrack, DEFAULT_BPM};
use midly::{Fps, MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

const DEFAULT_US_PER_QUARTER: u32 = 500_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChartImportErrorCode {
    SmfParseFailed,
    TrackNotFound,
    InvalidOptions,
    NoteOutOfRange,
}

impl ChartImportErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ChartImportErrorCode::SmfParseFailed => "SMF_PARSE_FAILED",
            ChartImportErrorCode::TrackNotFound => "TRACK_NOT_FOUND",
            ChartImportErrorCode::InvalidOptions => "INVALID_OPTIONS",
            ChartImportErrorCode::NoteOutOfRange => "NOTE_OUT_OF_RANGE",
        }
    }
}

/// Expected failures when turning an external file into a lane chart.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ChartImportError {
    #[error("SMF_PARSE_FAILED: {0}")]
    SmfParseFailed(String),
    #[error("TRACK_NOT_FOUND: {0}")]
    TrackNotFound(String),
    #[error("INVALID_OPTIONS: {0}")]
    InvalidOptions(String),
    #[error("NOTE_OUT_OF_RANGE: {0}")]
    NoteOutOfRange(String),
}

impl ChartImportError {
    pub fn code(&self) -> ChartImportErrorCode {
        match self {
            ChartImportError::SmfParseFailed(_) => ChartImportErrorCode::SmfParseFailed,
            ChartImportError::TrackNotFound(_) => ChartImportErrorCode::TrackNotFound,
            ChartImportError::InvalidOptions(_) => ChartImportErrorCode::InvalidOptions,
            ChartImportError::NoteOutOfRange(_) => ChartImportErrorCode::NoteOutOfRange,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ChartImportError::SmfParseFailed(m)
            | ChartImportError::TrackNotFound(m)
            | ChartImportError::InvalidOptions(m)
            | ChartImportError::NoteOutOfRange(m) => m,
        }
    }
}

/// SMF content after container decoding, with times already in seconds.
/// Values are raw: nothing here has been range-checked yet.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedSmf {
    pub ppq: u16,
    pub tempos: Vec<DecodedTempo>,
    pub tracks: Vec<DecodedTrack>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecodedTempo {
    pub tick: u64,
    pub bpm: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DecodedTrack {
    pub name: Option<String>,
    pub channel: Option<u8>,
    pub notes: Vec<DecodedNote>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecodedNote {
    pub midi: f64,
    pub time_seconds: f64,
    pub duration_seconds: f64,
    pub velocity: u8,
}

pub fn parse_smf_bytes(data: &[u8]) -> Result<ParsedSmf, ChartImportError> {
    normalize_decoded_smf(decode_smf(data)?)
}

pub fn decode_smf(data: &[u8]) -> Result<DecodedSmf, ChartImportError> {
    let smf = Smf::parse(data)
        .map_err(|e| ChartImportError::SmfParseFailed(format!("failed to decode SMF: {e}")))?;

    let (ppq, clock) = match smf.header.timing {
        Timing::Metrical(ticks) => {
            let ppq = ticks.as_int();
            (ppq, TickClock::Metrical { ppq: ppq.max(1) })
        }
        Timing::Timecode(fps, ticks_per_frame) => {
            let ticks_per_second = timecode_ticks_per_second(fps, ticks_per_frame);
            (0, TickClock::Timecode { ticks_per_second })
        }
    };

    // Tempo changes are global in SMF regardless of the track that carries them.
    let mut tempo_points: BTreeMap<u64, u32> = BTreeMap::new();
    let mut tempos: Vec<DecodedTempo> = Vec::new();
    for track in &smf.tracks {
        let mut tick: u64 = 0;
        for event in track {
            tick += event.delta.as_int() as u64;
            if let TrackEventKind::Meta(MetaMessage::Tempo(us_per_quarter)) = event.kind {
                let us_per_quarter = us_per_quarter.as_int();
                tempo_points.entry(tick).or_insert(us_per_quarter);
                tempos.push(DecodedTempo {
                    tick,
                    bpm: 60_000_000.0 / us_per_quarter as f64,
                });
            }
        }
    }
    tempos.sort_by_key(|tempo| tempo.tick);
    let tempo_map = TempoMap::new(clock, tempo_points);

    let tracks = smf
        .tracks
        .iter()
        .map(|track| decode_track(track, &tempo_map))
        .collect::<Vec<_>>();

    log::debug!(
        "decoded SMF: ppq={ppq}, {} tempo events, {} tracks",
        tempos.len(),
        tracks.len()
    );

    Ok(DecodedSmf {
        ppq,
        tempos,
        tracks,
    })
}

fn decode_track(track: &[midly::TrackEvent<'_>], tempo_map: &TempoMap) -> DecodedTrack {
    let mut name: Option<String> = None;
    let mut channel: Option<u8> = None;
    let mut open: BTreeMap<(u8, u8), VecDeque<(u64, u8)>> = BTreeMap::new();
    let mut spans: Vec<(u64, u64, u8, u8)> = Vec::new();
    let mut tick: u64 = 0;

    for event in track {
        tick += event.delta.as_int() as u64;
        match event.kind {
            TrackEventKind::Meta(MetaMessage::TrackName(raw)) if name.is_none() => {
                name = Some(String::from_utf8_lossy(raw).into_owned());
            }
            TrackEventKind::Midi {
                channel: ch,
                message,
            } => {
                let ch = ch.as_int();
                match message {
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                        channel.get_or_insert(ch);
                        open.entry((ch, key.as_int()))
                            .or_default()
                            .push_back((tick, vel.as_int()));
                    }
                    MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                        let key = key.as_int();
                        if let Some((start, velocity)) =
                            open.get_mut(&(ch, key)).and_then(|q| q.pop_front())
                        {
                            spans.push((start, tick, key, velocity));
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    // Close anything still sounding at the track's last event.
    for ((_, key), queue) in open {
        for (start, velocity) in queue {
            spans.push((start, tick, key, velocity));
        }
    }

    let notes = spans
        .into_iter()
        .map(|(start, end, key, velocity)| {
            let time_seconds = tempo_map.tick_to_seconds(start);
            DecodedNote {
                midi: key as f64,
                time_seconds,
                duration_seconds: tempo_map.tick_to_seconds(end) - time_seconds,
                velocity,
            }
        })
        .collect();

    DecodedTrack {
        name,
        channel,
        notes,
    }
}

pub fn normalize_decoded_smf(decoded: DecodedSmf) -> Result<ParsedSmf, ChartImportError> {
    let bpm = decoded
        .tempos
        .first()
        .map(|tempo| tempo.bpm)
        .filter(|bpm| bpm.is_finite() && *bpm > 0.0)
        .unwrap_or(DEFAULT_BPM);

    let mut tracks = Vec::with_capacity(decoded.tracks.len());
    for (track_index, track) in decoded.tracks.into_iter().enumerate() {
        let mut notes = Vec::with_capacity(track.notes.len());
        for (note_index, note) in track.notes.iter().enumerate() {
            notes.push(SmfNote {
                midi_note: normalize_midi_note(note.midi, track_index, note_index)?,
                time_ms: seconds_to_ms(note.time_seconds, track_index, note_index, "time")?,
                duration_ms: seconds_to_ms(
                    note.duration_seconds,
                    track_index,
                    note_index,
                    "duration",
                )?,
                velocity: note.velocity,
            });
        }
        notes.sort_by(|a, b| {
            a.time_ms
                .cmp(&b.time_ms)
                .then_with(|| a.duration_ms.cmp(&b.duration_ms))
                .then_with(|| a.midi_note.cmp(&b.midi_note))
        });

        let name = track
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Track {}", track_index + 1));

        tracks.push(SmfTrack {
            index: track_index,
            name,
            channel: track.channel,
            notes,
        });
    }

    Ok(ParsedSmf {
        bpm,
        ppq: decoded.ppq,
        tracks,
    })
}

fn normalize_midi_note(
    raw: f64,
    track_index: usize,
    note_index: usize,
) -> Result<u8, ChartImportError> {
    let rounded = round_half_up(raw);
    if !rounded.is_finite() || !(0.0..=127.0).contains(&rounded) {
        return Err(ChartImportError::SmfParseFailed(format!(
            "track {track_index} note {note_index}: midi must be within 0..=127 (got {raw})"
        )));
    }
    Ok(rounded as u8)
}

fn seconds_to_ms(
    seconds: f64,
    track_index: usize,
    note_index: usize,
    field: &str,
) -> Result<u64, ChartImportError> {
    if !seconds.is_finite() {
        return Err(ChartImportError::SmfParseFailed(format!(
            "track {track_index} note {note_index}: {field} must be a finite number of seconds (got {seconds})"
        )));
    }
    Ok(round_half_up(seconds.max(0.0) * 1000.0) as u64)
}

fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

#[derive(Clone, Copy, Debug)]
enum TickClock {
    Metrical { ppq: u16 },
    Timecode { ticks_per_second: f64 },
}

#[derive(Clone, Copy, Debug)]
struct TempoSegment {
    start_tick: u64,
    start_seconds: f64,
    seconds_per_tick: f64,
}

struct TempoMap {
    segments: Vec<TempoSegment>,
}

impl TempoMap {
    fn new(clock: TickClock, mut points: BTreeMap<u64, u32>) -> Self {
        let ppq = match clock {
            TickClock::Metrical { ppq } => ppq,
            TickClock::Timecode { ticks_per_second } => {
                return Self {
                    segments: vec![TempoSegment {
                        start_tick: 0,
                        start_seconds: 0.0,
                        seconds_per_tick: 1.0 / ticks_per_second,
                    }],
                };
            }
        };

        points.entry(0).or_insert(DEFAULT_US_PER_QUARTER);
        let mut segments: Vec<TempoSegment> = Vec::with_capacity(points.len());
        for (tick, us_per_quarter) in points {
            let start_seconds = match segments.last() {
                Some(prev) => {
                    prev.start_seconds + (tick - prev.start_tick) as f64 * prev.seconds_per_tick
                }
                None => 0.0,
            };
            segments.push(TempoSegment {
                start_tick: tick,
                start_seconds,
                seconds_per_tick: us_per_quarter as f64 / 1_000_000.0 / ppq as f64,
            });
        }
        Self { segments }
    }

    fn tick_to_seconds(&self, tick: u64) -> f64 {
        let mut current = self.segments[0];
        for seg in &self.segments {
            if seg.start_tick > tick {
                break;
            }
            current = *seg;
        }
        current.start_seconds + (tick - current.start_tick) as f64 * current.seconds_per_tick
    }
}

fn timecode_ticks_per_second(fps: Fps, ticks_per_frame: u8) -> f64 {
    let ticks_per_frame = ticks_per_frame.max(1) as f64;
    let frames_per_second = match fps {
        Fps::Fps24 => 24.0,
        Fps::Fps25 => 25.0,
        Fps::Fps29 => 29.97,
        Fps::Fps30 => 30.0,
    };
    frames_per_second * ticks_per_frame
}
