//! Error types for scanning and startup validation.

use core::fmt;

/// A hardware fault raised while sampling inputs.
///
/// Pin failures are not retried: the firmware has no way back to a working
/// device without a working pin, so the cycle driver propagates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error<E> {
    /// Driving a matrix row active or inactive failed.
    RowDrive { row: usize, source: E },
    /// Reading a matrix column failed while its row was driven.
    ColumnRead { row: usize, col: usize, source: E },
    /// Reading a dedicated pin failed.
    PinRead { name: &'static str, source: E },
    /// Reading an encoder's pulse counter failed.
    CounterRead { encoder: usize, source: E },
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::RowDrive { row, source } => {
                write!(f, "failed to drive matrix row {}: {:?}", row, source)
            }
            Error::ColumnRead { row, col, source } => write!(
                f,
                "failed to read matrix column {} on row {}: {:?}",
                col, row, source
            ),
            Error::PinRead { name, source } => {
                write!(f, "failed to read pin '{}': {:?}", name, source)
            }
            Error::CounterRead { encoder, source } => {
                write!(f, "failed to read encoder {} counter: {:?}", encoder, source)
            }
        }
    }
}

/// A configuration that can never produce a valid report.
///
/// Detected once in [`ButtonBox::new`](crate::ButtonBox::new), never per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Encoders need at least one pulse per click.
    ZeroPulsesPerClick,
    /// The encoders were built with a different pulses-per-click setting
    /// than the configuration asks for.
    PulsesPerClickMismatch { config: u16, encoders: u16 },
    /// A matrix needs both rows and columns, or neither.
    IncompleteMatrix { rows: usize, cols: usize },
    /// More logical buttons are declared than the descriptor reports.
    TooManyButtons { declared: usize, capacity: usize },
    /// The descriptor declares more buttons than a report can hold.
    DescriptorTooLarge { buttons: usize },
    /// The descriptor's report length differs from the length registered
    /// with the transport.
    ReportLengthMismatch { descriptor: usize, transport: usize },
    /// The declaration does not describe the inputs actually wired up.
    DeclarationMismatch,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroPulsesPerClick => write!(f, "pulses per click must be at least 1"),
            ConfigError::PulsesPerClickMismatch { config, encoders } => write!(
                f,
                "configured for {} pulses per click but the encoders count {}",
                config, encoders
            ),
            ConfigError::IncompleteMatrix { rows, cols } => write!(
                f,
                "matrix needs both rows and columns or neither, got {} rows and {} columns",
                rows, cols
            ),
            ConfigError::TooManyButtons { declared, capacity } => write!(
                f,
                "{} buttons declared but the report descriptor only has {}",
                declared, capacity
            ),
            ConfigError::DescriptorTooLarge { buttons } => write!(
                f,
                "report descriptor declares {} buttons, at most {} are supported",
                buttons,
                crate::MAX_BUTTONS
            ),
            ConfigError::ReportLengthMismatch {
                descriptor,
                transport,
            } => write!(
                f,
                "report descriptor packs {} bytes but the transport expects {}",
                descriptor, transport
            ),
            ConfigError::DeclarationMismatch => {
                write!(f, "declaration does not match the scanned inputs")
            }
        }
    }
}
