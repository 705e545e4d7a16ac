//! Flattening of all inputs into the logical button vector.
//!
//! The order is fixed: matrix buttons row by row, then dedicated pins in the
//! order they were declared, then two buttons per encoder (counter-clockwise
//! first, clockwise second). The report descriptor numbers its buttons in
//! the same order, so changing it changes what the host sees.

use core::fmt;

use heapless::Vec;

use crate::encoder::Clicks;
use crate::matrix::Grid;
use crate::MAX_BUTTONS;

/// One cycle's button levels in declaration order.
pub type ButtonVector = Vec<bool, MAX_BUTTONS>;

/// Encoder rotation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    CounterClockwise,
    Clockwise,
}

impl Direction {
    pub fn short_name(self) -> &'static str {
        match self {
            Direction::CounterClockwise => "ccw",
            Direction::Clockwise => "cw",
        }
    }
}

/// What a logical button index stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonRole {
    Matrix { row: usize, col: usize },
    Dedicated(&'static str),
    Encoder { encoder: usize, direction: Direction },
}

impl fmt::Display for ButtonRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ButtonRole::Matrix { row, col } => write!(f, "matrix r{}c{}", row, col),
            ButtonRole::Dedicated(name) => write!(f, "{}", name),
            ButtonRole::Encoder { encoder, direction } => {
                write!(f, "encoder {} {}", encoder + 1, direction.short_name())
            }
        }
    }
}

/// The shape of a device's inputs, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declaration {
    pub rows: usize,
    pub cols: usize,
    pub dedicated: &'static [&'static str],
    pub encoders: usize,
}

impl Declaration {
    /// Synthetic buttons per encoder.
    pub const ENCODER_BUTTONS: usize = 2;

    pub const fn matrix_buttons(&self) -> usize {
        self.rows * self.cols
    }

    /// Total logical buttons.
    pub const fn button_count(&self) -> usize {
        self.matrix_buttons() + self.dedicated.len() + self.encoders * Self::ENCODER_BUTTONS
    }

    /// Index of the first dedicated-pin button.
    pub const fn dedicated_offset(&self) -> usize {
        self.matrix_buttons()
    }

    /// Index of the first encoder button.
    pub const fn encoder_offset(&self) -> usize {
        self.dedicated_offset() + self.dedicated.len()
    }

    pub fn role(&self, index: usize) -> Option<ButtonRole> {
        if index < self.dedicated_offset() {
            Some(ButtonRole::Matrix {
                row: index / self.cols,
                col: index % self.cols,
            })
        } else if index < self.encoder_offset() {
            Some(ButtonRole::Dedicated(
                self.dedicated[index - self.dedicated_offset()],
            ))
        } else if index < self.button_count() {
            let offset = index - self.encoder_offset();
            let direction = if offset % Self::ENCODER_BUTTONS == 0 {
                Direction::CounterClockwise
            } else {
                Direction::Clockwise
            };
            Some(ButtonRole::Encoder {
                encoder: offset / Self::ENCODER_BUTTONS,
                direction,
            })
        } else {
            None
        }
    }

    pub fn roles(&self) -> impl Iterator<Item = ButtonRole> + '_ {
        (0..self.button_count()).filter_map(|index| self.role(index))
    }
}

/// Turns queued clicks into one-cycle press/release pulses.
#[derive(Debug, Clone, Copy, Default)]
struct Pulse {
    pending: u32,
    pressed: bool,
}

impl Pulse {
    /// Queue `clicks` and return this cycle's level. A pressed cycle is
    /// always followed by a released one, so back-to-back clicks stay
    /// separate edges for the host.
    fn step(&mut self, clicks: u32, advance: bool) -> bool {
        self.pending = self.pending.saturating_add(clicks);
        if advance {
            if self.pressed {
                self.pressed = false;
            } else if self.pending > 0 {
                self.pending -= 1;
                self.pressed = true;
            }
        }
        self.pressed
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct EncoderPulses {
    counterclockwise: Pulse,
    clockwise: Pulse,
}

/// Combines scan results into the logical button vector.
///
/// Owns the per-encoder pulse state; everything else is rebuilt each cycle.
pub struct Aggregator<const ENCODERS: usize> {
    pulses: [EncoderPulses; ENCODERS],
}

impl<const ENCODERS: usize> Aggregator<ENCODERS> {
    pub fn new() -> Self {
        Self {
            pulses: [EncoderPulses::default(); ENCODERS],
        }
    }

    /// Build this cycle's button vector.
    ///
    /// `advance` is false when the previous report never reached the host;
    /// encoder pulses then hold their state so no click is lost.
    ///
    /// Inputs past [`MAX_BUTTONS`] are dropped;
    /// [`ButtonBox::new`](crate::ButtonBox::new) rejects such layouts up front.
    pub fn aggregate<const ROWS: usize, const COLS: usize>(
        &mut self,
        grid: &Grid<ROWS, COLS>,
        dedicated: &[bool],
        clicks: &[Clicks; ENCODERS],
        advance: bool,
    ) -> ButtonVector {
        let matrix = grid.iter().flatten().copied();
        let pins = dedicated.iter().copied();
        let encoders = self
            .pulses
            .iter_mut()
            .zip(clicks)
            .flat_map(|(pulses, clicks)| {
                [
                    pulses.counterclockwise.step(clicks.counterclockwise, advance),
                    pulses.clockwise.step(clicks.clockwise, advance),
                ]
            });

        matrix.chain(pins).chain(encoders).take(MAX_BUTTONS).collect()
    }

    /// Clicks queued but not yet pulsed, per encoder as (ccw, cw).
    pub fn pending(&self) -> [(u32, u32); ENCODERS] {
        core::array::from_fn(|encoder| {
            let pulses = &self.pulses[encoder];
            (pulses.counterclockwise.pending, pulses.clockwise.pending)
        })
    }
}

impl<const ENCODERS: usize> Default for Aggregator<ENCODERS> {
    fn default() -> Self {
        Self::new()
    }
}
