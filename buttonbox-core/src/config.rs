//! Timing and encoder settings for one device.

use crate::Duration;

/// Debounce time used when none is configured.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_ticks(20);

/// Row settle delay used when none is configured, in microseconds.
pub const DEFAULT_ROW_SETTLE_US: u32 = 10;

/// Scan and report settings.
///
/// Pin assignment and the declaration order live with the pins themselves
/// (see [`crate::layout`] for the Button Box v1 values).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// How long a raw level must hold before it is accepted.
    pub debounce: Duration,
    /// Wait after driving a matrix row before reading its columns.
    pub row_settle_us: u32,
    /// Encoder pulses that make up one click.
    pub pulses_per_click: u16,
    /// Minimum gap between two sent reports. Zero sends every change at once.
    pub min_report_interval: Duration,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            row_settle_us: DEFAULT_ROW_SETTLE_US,
            pulses_per_click: 1,
            min_report_interval: Duration::from_ticks(0),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
