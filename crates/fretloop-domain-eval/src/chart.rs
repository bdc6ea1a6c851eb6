use crate::error::ScoringError;
use fretloop_domain_chart::to_cents_from_midi_note;
use fretloop_ports::types::{Cents, Lane, TimeMs};
use serde::{Deserialize, Serialize};

/// Chart as handed to the engine. Times may lie outside the loop; they are wrapped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoopScoringChartInput {
    pub loop_duration_ms: TimeMs,
    pub notes: Vec<ScoringNoteInput>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoringNoteInput {
    pub id: Option<String>,
    pub lane: Lane,
    pub time_ms: TimeMs,
    pub duration_ms: TimeMs,
    pub fret: Option<f64>,
    pub target_midi_note: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InternalNote {
    pub id: String,
    pub lane: Lane,
    /// Wrapped into `[0, loop_duration_ms)`.
    pub time_ms: TimeMs,
    pub duration_ms: TimeMs,
    pub fret: Option<f64>,
    pub target_midi_note: f64,
    pub target_cents: Cents,
    /// Index in the input chart; only used to break ties.
    pub source_order: usize,
}

/// Engine-side chart, sorted by `(time_ms, source_order)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoopScoringChart {
    pub loop_duration_ms: TimeMs,
    pub notes: Vec<InternalNote>,
}

pub fn normalize_chart(input: &LoopScoringChartInput) -> Result<LoopScoringChart, ScoringError> {
    let loop_duration_ms = input.loop_duration_ms;
    if !loop_duration_ms.is_finite() || loop_duration_ms <= 0.0 {
        return Err(ScoringError::InvalidChart(format!(
            "loopDurationMs must be a positive finite number (got {loop_duration_ms})"
        )));
    }

    let mut notes = Vec::with_capacity(input.notes.len());
    for (source_order, note) in input.notes.iter().enumerate() {
        if !note.time_ms.is_finite() {
            return Err(note_error(source_order, "timeMs", "a finite number", note.time_ms));
        }
        if !note.duration_ms.is_finite() || note.duration_ms < 0.0 {
            return Err(note_error(
                source_order,
                "durationMs",
                "a finite number >= 0",
                note.duration_ms,
            ));
        }
        if let Some(fret) = note.fret.filter(|fret| !fret.is_finite()) {
            return Err(note_error(source_order, "fret", "a finite number", fret));
        }
        if !note.target_midi_note.is_finite() {
            return Err(note_error(
                source_order,
                "targetMidiNote",
                "a finite number",
                note.target_midi_note,
            ));
        }

        notes.push(InternalNote {
            id: note
                .id
                .clone()
                .unwrap_or_else(|| format!("note-{source_order}")),
            lane: note.lane,
            time_ms: wrap_time_ms(note.time_ms, loop_duration_ms),
            duration_ms: note.duration_ms,
            fret: note.fret,
            target_midi_note: note.target_midi_note,
            target_cents: to_cents_from_midi_note(note.target_midi_note)?,
            source_order,
        });
    }

    notes.sort_by(|a, b| {
        a.time_ms
            .total_cmp(&b.time_ms)
            .then_with(|| a.source_order.cmp(&b.source_order))
    });

    Ok(LoopScoringChart {
        loop_duration_ms,
        notes,
    })
}

/// Maps `time_ms` into `[0, loop_duration_ms)`; values already inside are returned as-is.
pub fn wrap_time_ms(time_ms: TimeMs, loop_duration_ms: TimeMs) -> TimeMs {
    if (0.0..loop_duration_ms).contains(&time_ms) {
        return time_ms;
    }
    let wrapped = time_ms.rem_euclid(loop_duration_ms);
    // rem_euclid can round up to the divisor for tiny negative inputs.
    if wrapped >= loop_duration_ms {
        0.0
    } else {
        wrapped
    }
}

fn note_error(index: usize, field: &str, rule: &str, value: f64) -> ScoringError {
    ScoringError::InvalidChart(format!("notes[{index}].{field} must be {rule} (got {value})"))
}
