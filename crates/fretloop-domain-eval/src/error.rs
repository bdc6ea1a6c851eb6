use fretloop_domain_chart::PitchError;

/// Integration bugs: bad numbers or structure handed to the scoring layer.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid chart: {0}")]
    InvalidChart(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Pitch(#[from] PitchError),
}
