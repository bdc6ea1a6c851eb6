use fretloop_ports::types::TimeMs;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportState {
    Stopped,
    Playing,
    Paused,
}

/// Turns the looping display playhead into a never-decreasing absolute timestamp.
///
/// The display position restarts at zero on every loop pass; the scoring engine
/// needs one timeline that keeps growing. A backwards jump larger than half a
/// loop counts as a wrap, smaller ones are treated as clock jitter and ignored.
#[derive(Clone, Debug)]
pub struct LoopTransport {
    state: TransportState,
    loop_duration_ms: TimeMs,
    wraps: u64,
    last_display_ms: TimeMs,
}

impl LoopTransport {
    pub fn new(loop_duration_ms: TimeMs) -> Self {
        Self {
            state: TransportState::Stopped,
            loop_duration_ms: sanitize_loop(loop_duration_ms),
            wraps: 0,
            last_display_ms: 0.0,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn loop_duration_ms(&self) -> TimeMs {
        self.loop_duration_ms
    }

    pub fn play(&mut self) {
        self.state = TransportState::Playing;
    }

    pub fn pause(&mut self) {
        if self.state == TransportState::Playing {
            self.state = TransportState::Paused;
        }
    }

    pub fn stop(&mut self) {
        self.state = TransportState::Stopped;
        self.rewind(0.0);
    }

    /// Jumps to a display position and starts a fresh absolute timeline there.
    pub fn seek(&mut self, display_ms: TimeMs) {
        let display_ms = self.fold(display_ms);
        self.rewind(display_ms);
    }

    pub fn set_loop_duration_ms(&mut self, loop_duration_ms: TimeMs) {
        self.loop_duration_ms = sanitize_loop(loop_duration_ms);
        self.rewind(0.0);
    }

    /// Feeds the current display position and returns the absolute playhead.
    pub fn observe(&mut self, display_ms: TimeMs) -> TimeMs {
        let display_ms = self.fold(display_ms);
        if display_ms < self.last_display_ms {
            if self.last_display_ms - display_ms > self.loop_duration_ms / 2.0 {
                self.wraps += 1;
            } else {
                return self.absolute_ms();
            }
        }
        self.last_display_ms = display_ms;
        self.absolute_ms()
    }

    pub fn absolute_ms(&self) -> TimeMs {
        self.wraps as f64 * self.loop_duration_ms + self.last_display_ms
    }

    pub fn display_position_ms(&self, absolute_ms: TimeMs) -> TimeMs {
        self.fold(absolute_ms)
    }

    fn rewind(&mut self, display_ms: TimeMs) {
        self.wraps = 0;
        self.last_display_ms = display_ms;
    }

    fn fold(&self, ms: TimeMs) -> TimeMs {
        if !ms.is_finite() {
            return self.last_display_ms;
        }
        let folded = ms.rem_euclid(self.loop_duration_ms);
        if folded >= self.loop_duration_ms {
            0.0
        } else {
            folded
        }
    }
}

fn sanitize_loop(loop_duration_ms: TimeMs) -> TimeMs {
    if loop_duration_ms.is_finite() && loop_duration_ms >= 1.0 {
        loop_duration_ms
    } else {
        1.0
    }
}
