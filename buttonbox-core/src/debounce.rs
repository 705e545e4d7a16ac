//! Per-input debounce logic.
//!
//! Each input remembers its last raw sample and when that sample last
//! changed. The confirmed level follows the raw level only after the raw
//! level has held for the settle time, which filters out contact bounce.

use crate::{Duration, Instant};

/// Time-based settling filter for one digital input.
#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    settle: Duration,
    state: Option<Settling>,
}

#[derive(Debug, Clone, Copy)]
struct Settling {
    /// Level last accepted as real.
    confirmed: bool,
    /// Most recent raw sample.
    raw: bool,
    /// When the raw sample last changed.
    changed_at: Instant,
}

impl Debouncer {
    pub const fn new(settle: Duration) -> Self {
        Self {
            settle,
            state: None,
        }
    }

    /// Feed one raw sample taken at `now` and return the confirmed level.
    /// `raw`: true = pressed/closed (polarity already normalized).
    pub fn sample(&mut self, raw: bool, now: Instant) -> bool {
        let Some(state) = self.state.as_mut() else {
            // Nothing to filter against yet: trust the first reading.
            self.state = Some(Settling {
                confirmed: raw,
                raw,
                changed_at: now,
            });
            return raw;
        };

        if raw != state.raw {
            state.raw = raw;
            state.changed_at = now;
        }
        if state.confirmed != raw {
            let held = now.checked_duration_since(state.changed_at);
            if held.is_some_and(|held| held >= self.settle) {
                state.confirmed = raw;
            }
        }

        state.confirmed
    }

    /// The confirmed level, or `None` before the first sample.
    pub fn confirmed(&self) -> Option<bool> {
        self.state.map(|state| state.confirmed)
    }
}
