use serde::{Deserialize, Serialize};

pub const LATENCY_OFFSET_MIN_MS: i32 = -150;
pub const LATENCY_OFFSET_MAX_MS: i32 = 150;

fn default_min_confidence() -> f64 {
    0.8
}

pub fn clamp_latency_offset_ms(ms: i32) -> i32 {
    ms.clamp(LATENCY_OFFSET_MIN_MS, LATENCY_OFFSET_MAX_MS)
}

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serde(String),
}

/// Per-lane open string overrides as the user saved them; unset lanes use the defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredTuning {
    pub e: Option<f64>,
    pub a: Option<f64>,
    pub d: Option<f64>,
    pub g: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsDto {
    pub latency_offset_ms: i32,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    pub tuning: StoredTuning,
    pub max_fret: Option<u32>,
}

impl Default for SettingsDto {
    fn default() -> Self {
        Self {
            latency_offset_ms: 0,
            min_confidence: default_min_confidence(),
            tuning: StoredTuning::default(),
            max_fret: None,
        }
    }
}

pub trait StoragePort: Send + Sync {
    fn load_settings(&self) -> Result<SettingsDto, StorageError>;
    fn save_settings(&self, s: &SettingsDto) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn latency_offset_is_clamped_to_supported_range() {
        assert_eq!(clamp_latency_offset_ms(-400), -150);
        assert_eq!(clamp_latency_offset_ms(35), 35);
        assert_eq!(clamp_latency_offset_ms(151), 150);
    }
}
