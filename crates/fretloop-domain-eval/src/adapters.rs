use crate::chart::{LoopScoringChartInput, ScoringNoteInput};
use crate::error::ScoringError;
use fretloop_domain_chart::{
    derive_loop_duration_ms, to_midi_note_from_lane_and_fret, ChartLike, ChartNoteView,
    OpenStringTuning,
};
use fretloop_ports::types::TimeMs;

/// Flat chart data: the loop length is taken from the chart when present, derived otherwise.
pub fn chart_data_to_scoring_chart<C: ChartLike + ?Sized>(
    chart: &C,
    tuning: &OpenStringTuning,
) -> Result<LoopScoringChartInput, ScoringError> {
    let views = chart.note_views();
    validate_spans(&views)?;
    let loop_duration_ms = match chart.loop_duration_ms() {
        Some(loop_duration_ms) => require_positive_loop(loop_duration_ms, "chart")?,
        None => derive_loop_duration_ms(views.iter().map(|note| (note.time_ms, note.duration_ms))),
    };
    build_input(&views, loop_duration_ms, tuning, "chart")
}

/// Scrolling-lane chart: the chart must carry its own positive loop length.
pub fn lane_chart_to_scoring_chart<C: ChartLike + ?Sized>(
    chart: &C,
    tuning: &OpenStringTuning,
) -> Result<LoopScoringChartInput, ScoringError> {
    let loop_duration_ms = chart.loop_duration_ms().ok_or_else(|| {
        ScoringError::InvalidChart("lane chart must define loopDurationMs".to_string())
    })?;
    let loop_duration_ms = require_positive_loop(loop_duration_ms, "lane chart")?;
    let views = chart.note_views();
    validate_spans(&views)?;
    build_input(&views, loop_duration_ms, tuning, "lane")
}

fn build_input(
    views: &[ChartNoteView],
    loop_duration_ms: TimeMs,
    tuning: &OpenStringTuning,
    id_prefix: &str,
) -> Result<LoopScoringChartInput, ScoringError> {
    let mut notes = Vec::with_capacity(views.len());
    for (index, view) in views.iter().enumerate() {
        let fret = match view.fret {
            Some(fret) if fret.is_finite() => fret,
            Some(fret) => {
                return Err(ScoringError::InvalidChart(format!(
                    "notes[{index}].fret must be a finite number (got {fret})"
                )));
            }
            None => {
                return Err(ScoringError::InvalidChart(format!(
                    "notes[{index}].fret is required to resolve a target pitch"
                )));
            }
        };
        let target_midi_note = to_midi_note_from_lane_and_fret(view.lane, fret, tuning)?;
        notes.push(ScoringNoteInput {
            id: Some(format!("{id_prefix}-{index}")),
            lane: view.lane,
            time_ms: view.time_ms,
            duration_ms: view.duration_ms,
            fret: Some(fret),
            target_midi_note,
        });
    }
    Ok(LoopScoringChartInput {
        loop_duration_ms,
        notes,
    })
}

fn validate_spans(views: &[ChartNoteView]) -> Result<(), ScoringError> {
    for (index, view) in views.iter().enumerate() {
        if !view.time_ms.is_finite() {
            return Err(ScoringError::InvalidChart(format!(
                "notes[{index}].timeMs must be a finite number (got {})",
                view.time_ms
            )));
        }
        if !view.duration_ms.is_finite() || view.duration_ms < 0.0 {
            return Err(ScoringError::InvalidChart(format!(
                "notes[{index}].durationMs must be a finite number >= 0 (got {})",
                view.duration_ms
            )));
        }
    }
    Ok(())
}

fn require_positive_loop(loop_duration_ms: TimeMs, what: &str) -> Result<TimeMs, ScoringError> {
    if loop_duration_ms.is_finite() && loop_duration_ms > 0.0 {
        Ok(loop_duration_ms)
    } else {
        Err(ScoringError::InvalidChart(format!(
            "{what} loopDurationMs must be a positive finite number (got {loop_duration_ms})"
        )))
    }
}
