//! Software quadrature decoding.
//!
//! The ATmega32U4 has no quadrature counter peripheral, so the firmware
//! samples each encoder's A/B lines from a timer interrupt and feeds them
//! through this decoder. Every valid Gray-code step moves the count by one;
//! a sample that skipped a state (both lines changed) is ignored.

/// Count change for each (previous state << 2 | current state) transition,
/// where a state is `A << 1 | B`.
const TRANSITIONS: [i8; 16] = [
    0, 1, -1, 0, //
    -1, 0, 0, 1, //
    1, 0, 0, -1, //
    0, -1, 1, 0, //
];

/// Running pulse count for one A/B pin pair.
#[derive(Debug, Clone, Copy)]
pub struct QuadratureDecoder {
    state: u8,
    count: i32,
}

impl QuadratureDecoder {
    /// Start from the lines' current levels with a count of zero.
    pub const fn new(a: bool, b: bool) -> Self {
        Self {
            state: encode(a, b),
            count: 0,
        }
    }

    /// Feed one sample of the A and B lines.
    pub fn update(&mut self, a: bool, b: bool) {
        let next = encode(a, b);
        let step = TRANSITIONS[usize::from(self.state << 2 | next)];
        self.count = self.count.wrapping_add(i32::from(step));
        self.state = next;
    }

    pub fn count(&self) -> i32 {
        self.count
    }
}

const fn encode(a: bool, b: bool) -> u8 {
    (a as u8) << 1 | b as u8
}
