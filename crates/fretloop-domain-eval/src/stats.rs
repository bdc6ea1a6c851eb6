use crate::engine::Judgement;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct ScoringStats {
    perfect: u32,
    good: u32,
    miss: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoringStatsSnapshot {
    pub perfect: u32,
    pub good: u32,
    pub miss: u32,
    pub total: u32,
    /// `(perfect + 0.5 * good) / total`, 0 before anything was judged.
    pub accuracy: f64,
}

impl ScoringStats {
    pub(crate) fn record(&mut self, judgement: Judgement) {
        match judgement {
            Judgement::Perfect => self.perfect += 1,
            Judgement::Good => self.good += 1,
            Judgement::Miss => self.miss += 1,
        }
    }

    pub(crate) fn snapshot(&self) -> ScoringStatsSnapshot {
        let total = self.perfect + self.good + self.miss;
        let accuracy = if total == 0 {
            0.0
        } else {
            (self.perfect as f64 + 0.5 * self.good as f64) / total as f64
        };
        ScoringStatsSnapshot {
            perfect: self.perfect,
            good: self.good,
            miss: self.miss,
            total,
            accuracy,
        }
    }
}
