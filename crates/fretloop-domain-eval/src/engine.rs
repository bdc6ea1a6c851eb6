use crate::chart::{normalize_chart, InternalNote, LoopScoringChart, LoopScoringChartInput};
use crate::config::{ScoringConfig, ScoringConfigOverrides};
use crate::error::ScoringError;
use crate::stats::{ScoringStats, ScoringStatsSnapshot};
use fretloop_ports::types::{Cents, Lane, TimeMs};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Upper bound on occurrences one note may retire in a single sweep.
pub const MAX_ELAPSED_LOOPS_PER_SWEEP: u64 = 100_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Judgement {
    Perfect,
    Good,
    Miss,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventSource {
    Input,
    AutoMiss,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JudgementReason {
    PerfectWindow,
    GoodWindow,
    PitchWindow,
    TimingWindow,
    PitchMissing,
    /// The occurrence's timing window closed without a matching sample.
    WindowElapsed,
}

/// The note occurrence a judgement refers to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchedNote {
    pub note_id: String,
    pub lane: Lane,
    pub fret: Option<f64>,
    pub note_time_ms: TimeMs,
    pub duration_ms: TimeMs,
    pub target_midi_note: f64,
    pub target_cents: Cents,
    pub source_order: usize,
    pub loop_index: u64,
    pub occurrence_time_ms: TimeMs,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoringEvent {
    pub judgement: Judgement,
    pub source: EventSource,
    pub reason: JudgementReason,
    pub evaluated_at_ms: TimeMs,
    pub adjusted_time_ms: TimeMs,
    /// `adjusted_time_ms - occurrence_time_ms`; positive means late.
    pub timing_error_ms: Option<TimeMs>,
    pub pitch_error_cents: Option<Cents>,
    pub note: MatchedNote,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoringInput {
    pub evaluated_at_ms: TimeMs,
    /// Missing or non-finite pitch still consumes the matched occurrence as a miss.
    pub pitch_cents: Option<Cents>,
    pub lane: Option<Lane>,
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    index: usize,
    loop_index: u64,
    occurrence_time_ms: TimeMs,
    timing_error_ms: TimeMs,
    source_order: usize,
}

impl Candidate {
    fn rank(&self, other: &Candidate) -> Ordering {
        self.timing_error_ms
            .abs()
            .total_cmp(&other.timing_error_ms.abs())
            .then_with(|| self.occurrence_time_ms.total_cmp(&other.occurrence_time_ms))
            .then_with(|| self.source_order.cmp(&other.source_order))
    }
}

/// Scores pitch samples against a chart that repeats forever.
///
/// Each note keeps a cursor to its earliest unresolved occurrence; cursors only
/// move forward, either through a match or through the auto-miss sweep. Callers
/// must feed non-decreasing `evaluated_at_ms` values and serialize all calls.
pub struct LoopScoringEngine {
    cfg: ScoringConfig,
    chart: LoopScoringChart,
    next_loop_index: Vec<u64>,
    stats: ScoringStats,
}

impl LoopScoringEngine {
    pub fn new(chart: &LoopScoringChartInput, cfg: ScoringConfig) -> Result<Self, ScoringError> {
        cfg.validate()?;
        let chart = normalize_chart(chart)?;
        let next_loop_index = vec![0; chart.notes.len()];
        Ok(Self {
            cfg,
            chart,
            next_loop_index,
            stats: ScoringStats::default(),
        })
    }

    pub fn evaluate(&mut self, input: ScoringInput) -> Result<Vec<ScoringEvent>, ScoringError> {
        let evaluated_at_ms = require_finite_time(input.evaluated_at_ms)?;
        let adjusted_time_ms = evaluated_at_ms + self.cfg.latency_offset_ms;

        let mut events = self.sweep_auto_misses(evaluated_at_ms, adjusted_time_ms)?;

        let Some(candidate) = self.find_candidate(adjusted_time_ms, input.lane) else {
            return Ok(events);
        };
        self.next_loop_index[candidate.index] = candidate.loop_index + 1;

        let event = self.judge(
            &candidate,
            evaluated_at_ms,
            adjusted_time_ms,
            input.pitch_cents,
        );
        self.stats.record(event.judgement);
        log::trace!(
            "{:?} ({:?}) for {} loop {} at {adjusted_time_ms} ms",
            event.judgement,
            event.reason,
            event.note.note_id,
            event.note.loop_index
        );
        events.push(event);
        Ok(events)
    }

    /// Lets time pass without a sample; returns the auto-misses that became due.
    pub fn advance(&mut self, evaluated_at_ms: TimeMs) -> Result<Vec<ScoringEvent>, ScoringError> {
        let evaluated_at_ms = require_finite_time(evaluated_at_ms)?;
        let adjusted_time_ms = evaluated_at_ms + self.cfg.latency_offset_ms;
        self.sweep_auto_misses(evaluated_at_ms, adjusted_time_ms)
    }

    /// Replaces the chart and starts over: cursors and stats go back to zero.
    pub fn set_chart(&mut self, chart: &LoopScoringChartInput) -> Result<(), ScoringError> {
        let chart = normalize_chart(chart)?;
        log::debug!(
            "scoring chart replaced: {} notes, loop {} ms",
            chart.notes.len(),
            chart.loop_duration_ms
        );
        self.next_loop_index = vec![0; chart.notes.len()];
        self.chart = chart;
        self.stats = ScoringStats::default();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.next_loop_index.iter_mut().for_each(|cursor| *cursor = 0);
        self.stats = ScoringStats::default();
    }

    pub fn reset_stats(&mut self) {
        self.stats = ScoringStats::default();
    }

    pub fn config(&self) -> ScoringConfig {
        self.cfg
    }

    pub fn update_config(&mut self, overrides: &ScoringConfigOverrides) -> Result<(), ScoringError> {
        self.cfg = self.cfg.merged(overrides)?;
        log::debug!("scoring config updated: {:?}", self.cfg);
        Ok(())
    }

    pub fn set_latency_offset_ms(&mut self, latency_offset_ms: TimeMs) -> Result<(), ScoringError> {
        self.update_config(&ScoringConfigOverrides {
            latency_offset_ms: Some(latency_offset_ms),
            ..ScoringConfigOverrides::default()
        })
    }

    pub fn stats(&self) -> ScoringStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn chart(&self) -> &LoopScoringChart {
        &self.chart
    }

    /// Cursor of the note at `index` in normalized chart order.
    pub fn next_loop_index(&self, index: usize) -> Option<u64> {
        self.next_loop_index.get(index).copied()
    }

    fn sweep_auto_misses(
        &mut self,
        evaluated_at_ms: TimeMs,
        adjusted_time_ms: TimeMs,
    ) -> Result<Vec<ScoringEvent>, ScoringError> {
        let miss_threshold_ms = adjusted_time_ms - self.cfg.timing_window_ms;
        let loop_duration_ms = self.chart.loop_duration_ms;

        // Work out every cursor move first so a rejected timestamp leaves state untouched.
        let mut elapsed_by_note = Vec::with_capacity(self.chart.notes.len());
        for (note, &cursor) in self.chart.notes.iter().zip(self.next_loop_index.iter()) {
            let first_occurrence_ms = occurrence_time_ms(note, cursor, loop_duration_ms);
            if first_occurrence_ms > miss_threshold_ms {
                elapsed_by_note.push(0);
                continue;
            }
            let elapsed =
                ((miss_threshold_ms - first_occurrence_ms) / loop_duration_ms).floor() + 1.0;
            if elapsed > MAX_ELAPSED_LOOPS_PER_SWEEP as f64 {
                return Err(too_far_ahead(evaluated_at_ms));
            }
            let elapsed = elapsed as u64;
            if cursor.checked_add(elapsed).is_none() {
                return Err(too_far_ahead(evaluated_at_ms));
            }
            elapsed_by_note.push(elapsed);
        }

        let mut events = Vec::new();
        for ((note, cursor), elapsed) in self
            .chart
            .notes
            .iter()
            .zip(self.next_loop_index.iter_mut())
            .zip(elapsed_by_note)
        {
            if elapsed == 0 {
                continue;
            }
            let first_loop_index = *cursor;
            for loop_index in first_loop_index..first_loop_index + elapsed {
                let occurrence_ms = occurrence_time_ms(note, loop_index, loop_duration_ms);
                events.push(ScoringEvent {
                    judgement: Judgement::Miss,
                    source: EventSource::AutoMiss,
                    reason: JudgementReason::WindowElapsed,
                    evaluated_at_ms,
                    adjusted_time_ms,
                    timing_error_ms: Some(adjusted_time_ms - occurrence_ms),
                    pitch_error_cents: None,
                    note: matched_note(note, loop_index, occurrence_ms),
                });
            }
            *cursor = first_loop_index + elapsed;
        }

        events.sort_by(|a, b| {
            a.note
                .occurrence_time_ms
                .total_cmp(&b.note.occurrence_time_ms)
                .then_with(|| a.note.source_order.cmp(&b.note.source_order))
        });
        for event in &events {
            self.stats.record(event.judgement);
        }
        if !events.is_empty() {
            log::trace!("{} auto-miss(es) at {adjusted_time_ms} ms", events.len());
        }
        Ok(events)
    }

    fn find_candidate(&self, adjusted_time_ms: TimeMs, lane: Option<Lane>) -> Option<Candidate> {
        let window_ms = self.cfg.timing_window_ms;
        let loop_duration_ms = self.chart.loop_duration_ms;
        let mut best: Option<Candidate> = None;

        for (index, note) in self.chart.notes.iter().enumerate() {
            if lane.is_some_and(|lane| lane != note.lane) {
                continue;
            }
            let loop_index = self.next_loop_index[index];
            let occurrence_ms = occurrence_time_ms(note, loop_index, loop_duration_ms);
            let timing_error_ms = adjusted_time_ms - occurrence_ms;
            if timing_error_ms.abs() > window_ms {
                continue;
            }

            let candidate = Candidate {
                index,
                loop_index,
                occurrence_time_ms: occurrence_ms,
                timing_error_ms,
                source_order: note.source_order,
            };
            if best.map_or(true, |current| candidate.rank(&current) == Ordering::Less) {
                best = Some(candidate);
            }
        }

        best
    }

    fn judge(
        &self,
        candidate: &Candidate,
        evaluated_at_ms: TimeMs,
        adjusted_time_ms: TimeMs,
        pitch_cents: Option<Cents>,
    ) -> ScoringEvent {
        let note = &self.chart.notes[candidate.index];
        let timing_error_ms = candidate.timing_error_ms;
        let pitch_error_cents = pitch_cents
            .filter(|cents| cents.is_finite())
            .map(|cents| cents - note.target_cents);

        let (judgement, reason) = match pitch_error_cents {
            None => (Judgement::Miss, JudgementReason::PitchMissing),
            Some(pitch_error) => self.grade(timing_error_ms.abs(), pitch_error.abs()),
        };

        ScoringEvent {
            judgement,
            source: EventSource::Input,
            reason,
            evaluated_at_ms,
            adjusted_time_ms,
            timing_error_ms: Some(timing_error_ms),
            pitch_error_cents,
            note: matched_note(note, candidate.loop_index, candidate.occurrence_time_ms),
        }
    }

    fn grade(&self, timing_abs_ms: TimeMs, pitch_abs_cents: Cents) -> (Judgement, JudgementReason) {
        let cfg = &self.cfg;
        if timing_abs_ms <= cfg.perfect_timing_window_ms
            && pitch_abs_cents <= cfg.perfect_pitch_window_cents
        {
            (Judgement::Perfect, JudgementReason::PerfectWindow)
        } else if timing_abs_ms <= cfg.timing_window_ms && pitch_abs_cents <= cfg.pitch_window_cents
        {
            (Judgement::Good, JudgementReason::GoodWindow)
        } else if pitch_abs_cents > cfg.pitch_window_cents {
            (Judgement::Miss, JudgementReason::PitchWindow)
        } else {
            // Candidates are already inside the timing window.
            (Judgement::Miss, JudgementReason::TimingWindow)
        }
    }
}

fn occurrence_time_ms(note: &InternalNote, loop_index: u64, loop_duration_ms: TimeMs) -> TimeMs {
    note.time_ms + loop_index as f64 * loop_duration_ms
}

fn matched_note(note: &InternalNote, loop_index: u64, occurrence_time_ms: TimeMs) -> MatchedNote {
    MatchedNote {
        note_id: note.id.clone(),
        lane: note.lane,
        fret: note.fret,
        note_time_ms: note.time_ms,
        duration_ms: note.duration_ms,
        target_midi_note: note.target_midi_note,
        target_cents: note.target_cents,
        source_order: note.source_order,
        loop_index,
        occurrence_time_ms,
    }
}

fn too_far_ahead(evaluated_at_ms: TimeMs) -> ScoringError {
    ScoringError::InvalidInput(format!(
        "evaluatedAtMs {evaluated_at_ms} is too far ahead of the chart cursor \
         (more than {MAX_ELAPSED_LOOPS_PER_SWEEP} loops would elapse at once)"
    ))
}

fn require_finite_time(evaluated_at_ms: TimeMs) -> Result<TimeMs, ScoringError> {
    if evaluated_at_ms.is_finite() {
        Ok(evaluated_at_ms)
    } else {
        Err(ScoringError::InvalidInput(format!(
            "evaluatedAtMs must be a finite number (got {evaluated_at_ms})"
        )))
    }
}
