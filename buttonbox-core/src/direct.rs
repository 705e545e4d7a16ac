//! Buttons wired individually between a pulled-up pin and ground.

use embedded_hal::digital::InputPin;

use crate::debounce::Debouncer;
use crate::error::Error;
use crate::{Duration, Instant};

/// Debounced dedicated-pin buttons, each with a declared name.
pub struct DirectPins<P, const N: usize> {
    names: [&'static str; N],
    pins: [P; N],
    debouncers: [Debouncer; N],
}

impl<P, E, const N: usize> DirectPins<P, N>
where
    P: InputPin<Error = E>,
{
    pub fn new(names: [&'static str; N], pins: [P; N], debounce: Duration) -> Self {
        Self {
            names,
            pins,
            debouncers: [Debouncer::new(debounce); N],
        }
    }

    pub fn names(&self) -> &[&'static str; N] {
        &self.names
    }

    pub fn scan(&mut self, now: Instant) -> Result<PinLevels<N>, Error<E>> {
        let mut levels = [false; N];
        for (((name, pin), debouncer), level) in self
            .names
            .iter()
            .zip(&mut self.pins)
            .zip(&mut self.debouncers)
            .zip(&mut levels)
        {
            let pressed = pin
                .is_low()
                .map_err(|source| Error::PinRead { name: *name, source })?;
            *level = debouncer.sample(pressed, now);
        }

        Ok(PinLevels {
            names: self.names,
            levels,
        })
    }
}

/// Confirmed levels of the dedicated pins, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinLevels<const N: usize> {
    names: [&'static str; N],
    levels: [bool; N],
}

impl<const N: usize> PinLevels<N> {
    pub fn get(&self, name: &str) -> Option<bool> {
        self.iter()
            .find(|(declared, _)| *declared == name)
            .map(|(_, level)| level)
    }

    pub fn levels(&self) -> &[bool; N] {
        &self.levels
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        self.names.iter().copied().zip(self.levels.iter().copied())
    }
}
