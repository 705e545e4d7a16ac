//! Input scanning and HID joystick reporting for the Button Box.
//!
//! This crate is `no_std` so the same engine runs in the AVR firmware and in
//! host-side tests and tooling. It provides:
//! - Time-based per-input debouncing
//! - Button matrix and dedicated-pin scanning over `embedded-hal` pins
//! - Rotary encoder click tracking (plus a software quadrature counter)
//! - Flattening of all inputs into one ordered logical button vector
//! - Bit-packed joystick reports and the matching report descriptor
//! - The per-cycle `read_and_report` driver

#![cfg_attr(not(test), no_std)]

pub mod aggregate;
pub mod config;
pub mod debounce;
pub mod descriptor;
pub mod direct;
pub mod driver;
pub mod encoder;
pub mod error;
pub mod layout;
pub mod matrix;
pub mod quadrature;
pub mod report;

#[cfg(test)]
mod mock;

pub use aggregate::{Aggregator, ButtonRole, ButtonVector, Declaration, Direction};
pub use config::Config;
pub use debounce::Debouncer;
pub use descriptor::ReportDescriptor;
pub use direct::{DirectPins, PinLevels};
pub use driver::{ButtonBox, Delivery, HidTransport};
pub use encoder::{Clicks, EncoderTracker, Encoders, PulseCounter};
pub use error::{ConfigError, Error};
pub use matrix::{Grid, Matrix};
pub use quadrature::QuadratureDecoder;
pub use report::Report;

/// Monotonic timestamp with millisecond ticks.
pub type Instant = fugit::TimerInstantU32<1000>;
/// Millisecond duration.
pub type Duration = fugit::MillisDurationU32;

/// Upper bound on declared buttons (logical vector and report capacity).
pub const MAX_BUTTONS: usize = 128;
/// Largest report in bytes, excluding the report ID.
pub const MAX_REPORT_LEN: usize = MAX_BUTTONS / 8;
