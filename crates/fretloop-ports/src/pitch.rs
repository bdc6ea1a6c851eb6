use crate::types::{Cents, CENTS_PER_SEMITONE};
use serde::{Deserialize, Serialize};

/// One estimate from the pitch detector. Confidence thresholding belongs to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PitchSample {
    pub frequency_hz: Option<f64>,
    pub midi_note: Option<f64>,
    pub cents_error: Option<f64>,
    pub confidence: f64, // 0..=1
}

impl PitchSample {
    pub fn silent() -> Self {
        Self {
            frequency_hz: None,
            midi_note: None,
            cents_error: None,
            confidence: 0.0,
        }
    }

    /// `midi_note * 100 + cents_error`, or `None` when either part is unusable.
    pub fn combined_cents(&self) -> Option<Cents> {
        let midi = self.midi_note.filter(|v| v.is_finite())?;
        let cents = self.cents_error.filter(|v| v.is_finite())?;
        Some(midi * CENTS_PER_SEMITONE + cents)
    }
}
