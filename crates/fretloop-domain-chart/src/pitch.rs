use fretloop_ports::storage::StoredTuning;
use fretloop_ports::types::{Cents, Lane, CENTS_PER_SEMITONE};
use serde::{Deserialize, Serialize};

pub const DEFAULT_OPEN_STRING_MIDI: OpenStringTuning = OpenStringTuning {
    e: 28.0,
    a: 33.0,
    d: 38.0,
    g: 43.0,
};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PitchError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Partial open string table; `None` falls back to the default for that lane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningOverrides {
    pub e: Option<f64>,
    pub a: Option<f64>,
    pub d: Option<f64>,
    pub g: Option<f64>,
}

impl TuningOverrides {
    pub fn get(&self, lane: Lane) -> Option<f64> {
        match lane {
            Lane::E => self.e,
            Lane::A => self.a,
            Lane::D => self.d,
            Lane::G => self.g,
        }
    }
}

impl From<StoredTuning> for TuningOverrides {
    fn from(stored: StoredTuning) -> Self {
        Self {
            e: stored.e,
            a: stored.a,
            d: stored.d,
            g: stored.g,
        }
    }
}

/// Complete open string MIDI table, one entry per lane.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpenStringTuning {
    pub e: f64,
    pub a: f64,
    pub d: f64,
    pub g: f64,
}

impl OpenStringTuning {
    pub fn get(&self, lane: Lane) -> f64 {
        match lane {
            Lane::E => self.e,
            Lane::A => self.a,
            Lane::D => self.d,
            Lane::G => self.g,
        }
    }
}

impl Default for OpenStringTuning {
    fn default() -> Self {
        DEFAULT_OPEN_STRING_MIDI
    }
}

pub fn resolve_open_string_midi_by_lane(
    overrides: &TuningOverrides,
) -> Result<OpenStringTuning, PitchError> {
    let mut table = DEFAULT_OPEN_STRING_MIDI;
    for lane in Lane::ALL {
        let Some(value) = overrides.get(lane) else {
            continue;
        };
        if !value.is_finite() {
            return Err(PitchError::InvalidArgument(format!(
                "openStringMidiByLane.{lane} must be a finite number (got {value})"
            )));
        }
        match lane {
            Lane::E => table.e = value,
            Lane::A => table.a = value,
            Lane::D => table.d = value,
            Lane::G => table.g = value,
        }
    }
    Ok(table)
}

pub fn to_midi_note_from_lane_and_fret(
    lane: Lane,
    fret: f64,
    table: &OpenStringTuning,
) -> Result<f64, PitchError> {
    if !fret.is_finite() {
        return Err(PitchError::InvalidArgument(format!(
            "fret must be a finite number (got {fret})"
        )));
    }
    Ok(table.get(lane) + fret)
}

pub fn to_cents_from_midi_note(midi_note: f64) -> Result<Cents, PitchError> {
    if !midi_note.is_finite() {
        return Err(PitchError::InvalidArgument(format!(
            "midiNote must be a finite number (got {midi_note})"
        )));
    }
    Ok(midi_note * CENTS_PER_SEMITONE)
}
