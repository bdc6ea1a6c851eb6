use crate::midi_import::ChartImportError;
use crate::model::{derive_loop_duration_ms, LaneChart, LaneChartNote, ParsedSmf, SmfNote};
use crate::pitch::{resolve_open_string_midi_by_lane, OpenStringTuning, TuningOverrides};
use fretloop_ports::types::Lane;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneMapOptions {
    pub open_string_midi_by_lane: TuningOverrides,
    /// Highest playable fret; `None` is unbounded. Fractions are floored.
    pub max_fret: Option<f64>,
}

pub fn convert_smf_track_to_lane_chart(
    parsed: &ParsedSmf,
    track_index: i64,
    options: &LaneMapOptions,
) -> Result<LaneChart, ChartImportError> {
    let index = usize::try_from(track_index).map_err(|_| {
        ChartImportError::TrackNotFound(format!(
            "trackIndex must be a non-negative integer. Received: {track_index}"
        ))
    })?;
    let track = parsed
        .tracks
        .iter()
        .find(|track| track.index == index)
        .ok_or_else(|| {
            ChartImportError::TrackNotFound(format!("track {index} does not exist"))
        })?;

    let (tuning, max_fret) = validate_options(options)?;

    let mut notes = Vec::with_capacity(track.notes.len());
    for (note_index, note) in track.notes.iter().enumerate() {
        let Some((lane, fret)) = pick_lane_and_fret(note.midi_note, &tuning, max_fret) else {
            log::warn!(
                "track {index} note {note_index} (midi {}) cannot be placed on any lane",
                note.midi_note
            );
            return Err(out_of_range(index, note_index, note, max_fret));
        };
        notes.push(LaneChartNote {
            lane,
            fret,
            midi_note: note.midi_note,
            time_ms: note.time_ms,
            duration_ms: note.duration_ms,
        });
    }

    notes.sort_by(|a, b| {
        a.time_ms
            .cmp(&b.time_ms)
            .then_with(|| a.duration_ms.cmp(&b.duration_ms))
            .then_with(|| a.fret.cmp(&b.fret))
            .then_with(|| a.lane.order_index().cmp(&b.lane.order_index()))
    });

    let loop_duration_ms = derive_loop_duration_ms(
        notes
            .iter()
            .map(|note| (note.time_ms as f64, note.duration_ms as f64)),
    ) as u64;

    log::debug!(
        "converted track {index} ({:?}) into {} lane notes, loop {loop_duration_ms} ms",
        track.name,
        notes.len()
    );

    Ok(LaneChart {
        track_index: index,
        track_name: track.name.clone(),
        bpm: parsed.bpm,
        loop_duration_ms,
        notes,
    })
}

fn validate_options(
    options: &LaneMapOptions,
) -> Result<(OpenStringTuning, Option<u32>), ChartImportError> {
    let tuning = resolve_open_string_midi_by_lane(&options.open_string_midi_by_lane)
        .map_err(|e| ChartImportError::InvalidOptions(e.to_string()))?;
    for lane in Lane::ALL {
        let open = tuning.get(lane);
        if open.fract() != 0.0 {
            return Err(ChartImportError::InvalidOptions(format!(
                "openStringMidiByLane.{lane} must be an integer."
            )));
        }
        if !(0.0..=127.0).contains(&open) {
            return Err(ChartImportError::InvalidOptions(format!(
                "openStringMidiByLane.{lane} must be within 0..=127."
            )));
        }
    }

    let max_fret = match options.max_fret {
        None => None,
        Some(value) if !value.is_finite() => {
            return Err(ChartImportError::InvalidOptions(
                "maxFret must be a finite number.".to_string(),
            ));
        }
        Some(value) if value < 0.0 => {
            return Err(ChartImportError::InvalidOptions(
                "maxFret must be >= 0.".to_string(),
            ));
        }
        Some(value) => Some(value.floor().min(u32::MAX as f64) as u32),
    };

    Ok((tuning, max_fret))
}

/// Lane giving the lowest non-negative fret within bounds; equal frets keep E-A-D-G order.
fn pick_lane_and_fret(
    midi_note: u8,
    tuning: &OpenStringTuning,
    max_fret: Option<u32>,
) -> Option<(Lane, u32)> {
    let mut best: Option<(Lane, u32)> = None;
    for lane in Lane::ALL {
        let fret = midi_note as f64 - tuning.get(lane);
        if fret < 0.0 {
            continue;
        }
        // Open strings are validated to 0..=127, so the fret fits a MIDI key.
        let Ok(fret) = u32::try_from(fret as i64) else {
            continue;
        };
        if max_fret.is_some_and(|max| fret > max) {
            continue;
        }
        if best.map_or(true, |(_, current)| fret < current) {
            best = Some((lane, fret));
        }
    }
    best
}

fn out_of_range(
    track_index: usize,
    note_index: usize,
    note: &SmfNote,
    max_fret: Option<u32>,
) -> ChartImportError {
    let bound = max_fret.map_or_else(|| "unbounded".to_string(), |max| max.to_string());
    ChartImportError::NoteOutOfRange(format!(
        "track {track_index} note {note_index} (midi {} at {} ms) does not fit any lane with maxFret {bound}",
        note.midi_note, note.time_ms
    ))
}
