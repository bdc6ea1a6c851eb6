use crate::error::ScoringError;
use fretloop_ports::types::{Cents, TimeMs};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMING_WINDOW_MS: TimeMs = 80.0;
pub const DEFAULT_PITCH_WINDOW_CENTS: Cents = 35.0;
pub const DEFAULT_LATENCY_OFFSET_MS: TimeMs = 0.0;
pub const DEFAULT_PERFECT_TIMING_WINDOW_MS: TimeMs = 40.0;
pub const DEFAULT_PERFECT_PITCH_WINDOW_CENTS: Cents = 20.0;

/// Judgement windows and latency compensation. Always valid once constructed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub timing_window_ms: TimeMs,
    pub pitch_window_cents: Cents,
    /// Added to every evaluation timestamp; may be negative.
    pub latency_offset_ms: TimeMs,
    pub perfect_timing_window_ms: TimeMs,
    pub perfect_pitch_window_cents: Cents,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfigOverrides {
    pub timing_window_ms: Option<TimeMs>,
    pub pitch_window_cents: Option<Cents>,
    pub latency_offset_ms: Option<TimeMs>,
    pub perfect_timing_window_ms: Option<TimeMs>,
    pub perfect_pitch_window_cents: Option<Cents>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            timing_window_ms: DEFAULT_TIMING_WINDOW_MS,
            pitch_window_cents: DEFAULT_PITCH_WINDOW_CENTS,
            latency_offset_ms: DEFAULT_LATENCY_OFFSET_MS,
            perfect_timing_window_ms: DEFAULT_PERFECT_TIMING_WINDOW_MS,
            perfect_pitch_window_cents: DEFAULT_PERFECT_PITCH_WINDOW_CENTS,
        }
    }
}

impl ScoringConfig {
    pub fn new(overrides: &ScoringConfigOverrides) -> Result<Self, ScoringError> {
        Self::default().merged(overrides)
    }

    /// Applies `overrides` on top of `self` and validates the whole result.
    pub fn merged(&self, overrides: &ScoringConfigOverrides) -> Result<Self, ScoringError> {
        let merged = Self {
            timing_window_ms: overrides.timing_window_ms.unwrap_or(self.timing_window_ms),
            pitch_window_cents: overrides
                .pitch_window_cents
                .unwrap_or(self.pitch_window_cents),
            latency_offset_ms: overrides.latency_offset_ms.unwrap_or(self.latency_offset_ms),
            perfect_timing_window_ms: overrides
                .perfect_timing_window_ms
                .unwrap_or(self.perfect_timing_window_ms),
            perfect_pitch_window_cents: overrides
                .perfect_pitch_window_cents
                .unwrap_or(self.perfect_pitch_window_cents),
        };
        merged.validate()?;
        Ok(merged)
    }

    pub fn validate(&self) -> Result<(), ScoringError> {
        let fields = [
            ("timingWindowMs", self.timing_window_ms),
            ("pitchWindowCents", self.pitch_window_cents),
            ("latencyOffsetMs", self.latency_offset_ms),
            ("perfectTimingWindowMs", self.perfect_timing_window_ms),
            ("perfectPitchWindowCents", self.perfect_pitch_window_cents),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(ScoringError::InvalidConfig(format!(
                    "{name} must be a finite number (got {value})"
                )));
            }
        }

        let windows = [
            ("timingWindowMs", self.timing_window_ms),
            ("pitchWindowCents", self.pitch_window_cents),
            ("perfectTimingWindowMs", self.perfect_timing_window_ms),
            ("perfectPitchWindowCents", self.perfect_pitch_window_cents),
        ];
        for (name, value) in windows {
            if value <= 0.0 {
                return Err(ScoringError::InvalidConfig(format!(
                    "{name} must be > 0 (got {value})"
                )));
            }
        }

        if self.perfect_timing_window_ms > self.timing_window_ms {
            return Err(ScoringError::InvalidConfig(format!(
                "perfectTimingWindowMs ({}) must be <= timingWindowMs ({})",
                self.perfect_timing_window_ms, self.timing_window_ms
            )));
        }
        if self.perfect_pitch_window_cents > self.pitch_window_cents {
            return Err(ScoringError::InvalidConfig(format!(
                "perfectPitchWindowCents ({}) must be <= pitchWindowCents ({})",
                self.perfect_pitch_window_cents, self.pitch_window_cents
            )));
        }
        Ok(())
    }
}
