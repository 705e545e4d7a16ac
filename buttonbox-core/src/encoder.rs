//! Rotary encoder click tracking.
//!
//! A pulse counter (hardware or [`QuadratureDecoder`](crate::QuadratureDecoder)
//! driven) keeps a running total. Each cycle the tracker turns the change in
//! that total into whole clicks. Leftover pulses that do not make up a full
//! click stay pending for the next cycle.

use crate::error::Error;

/// Source of an encoder's running pulse count.
pub trait PulseCounter {
    type Error;

    /// Current pulse total. Positive deltas are clockwise.
    fn count(&mut self) -> Result<i32, Self::Error>;
}

/// Whole clicks registered during one poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Clicks {
    pub clockwise: u32,
    pub counterclockwise: u32,
}

impl Clicks {
    pub const NONE: Clicks = Clicks {
        clockwise: 0,
        counterclockwise: 0,
    };

    pub fn is_empty(&self) -> bool {
        self.clockwise == 0 && self.counterclockwise == 0
    }
}

/// Converts absolute pulse counts into click events for one encoder.
#[derive(Debug, Clone, Copy)]
pub struct EncoderTracker {
    /// Pulse count up to which clicks have been consumed.
    last: i32,
    pulses_per_click: u16,
}

impl EncoderTracker {
    /// `start` is the counter's value at startup; `pulses_per_click` must be
    /// non-zero (checked by [`ButtonBox::new`](crate::ButtonBox::new)).
    pub const fn new(start: i32, pulses_per_click: u16) -> Self {
        Self {
            last: start,
            pulses_per_click,
        }
    }

    pub fn poll(&mut self, count: i32) -> Clicks {
        let ppc = i64::from(self.pulses_per_click.max(1));
        let delta = i64::from(count) - i64::from(self.last);
        let clicks = delta / ppc;

        // Only advance by whole clicks so partial pulses are carried over.
        self.last = self.last.wrapping_add((clicks * ppc) as i32);

        if clicks > 0 {
            Clicks {
                clockwise: clicks as u32,
                counterclockwise: 0,
            }
        } else {
            Clicks {
                clockwise: 0,
                counterclockwise: clicks.unsigned_abs() as u32,
            }
        }
    }

    /// Pulses seen but not yet consumed as a click (signed).
    pub fn pending(&self, count: i32) -> i32 {
        count.wrapping_sub(self.last) % i32::from(self.pulses_per_click.max(1))
    }
}

/// The encoders of a device, polled in declaration order.
pub struct Encoders<Q, const N: usize> {
    counters: [Q; N],
    trackers: [EncoderTracker; N],
    pulses_per_click: u16,
}

impl<Q, E, const N: usize> Encoders<Q, N>
where
    Q: PulseCounter<Error = E>,
{
    /// Take ownership of the counters and start tracking from their current
    /// values, so pulses from before startup never turn into clicks.
    pub fn new(mut counters: [Q; N], pulses_per_click: u16) -> Result<Self, Error<E>> {
        let mut trackers = [EncoderTracker::new(0, pulses_per_click); N];
        for (encoder, (counter, tracker)) in counters.iter_mut().zip(&mut trackers).enumerate() {
            let start = counter
                .count()
                .map_err(|source| Error::CounterRead { encoder, source })?;
            *tracker = EncoderTracker::new(start, pulses_per_click);
        }
        Ok(Self {
            counters,
            trackers,
            pulses_per_click,
        })
    }

    pub fn pulses_per_click(&self) -> u16 {
        self.pulses_per_click
    }

    pub fn poll(&mut self) -> Result<[Clicks; N], Error<E>> {
        let mut clicks = [Clicks::NONE; N];
        for (encoder, ((counter, tracker), out)) in self
            .counters
            .iter_mut()
            .zip(&mut self.trackers)
            .zip(&mut clicks)
            .enumerate()
        {
            let count = counter
                .count()
                .map_err(|source| Error::CounterRead { encoder, source })?;
            *out = tracker.poll(count);
            if !out.is_empty() {
                log::debug!(
                    "encoder {}: {} cw, {} ccw",
                    encoder,
                    out.clockwise,
                    out.counterclockwise
                );
            }
        }
        Ok(clicks)
    }
}
