use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type TimeMs = f64; // milliseconds, period-relative inside charts, absolute at the engine boundary
pub type Cents = f64; // midi note number x 100

pub const CENTS_PER_SEMITONE: f64 = 100.0;

/// One of the four instrument strings, lowest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Lane {
    E,
    A,
    D,
    G,
}

impl Lane {
    pub const ALL: [Lane; 4] = [Lane::E, Lane::A, Lane::D, Lane::G];

    pub fn order_index(self) -> usize {
        match self {
            Lane::E => 0,
            Lane::A => 1,
            Lane::D => 2,
            Lane::G => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Lane::E => "E",
            Lane::A => "A",
            Lane::D => "D",
            Lane::G => "G",
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown lane: {0:?}")]
pub struct UnknownLane(pub String);

impl FromStr for Lane {
    type Err = UnknownLane;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "E" => Ok(Lane::E),
            "A" => Ok(Lane::A),
            "D" => Ok(Lane::D),
            "G" => Ok(Lane::G),
            other => Err(UnknownLane(other.to_string())),
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
