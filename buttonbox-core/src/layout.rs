//! Button Box v1: a 6x6 matrix, an escape button and five encoders on a
//! Teensy 2.0.
//!
//! Shared by the firmware (pin counts, descriptor, timing) and the host
//! tool (USB IDs, button names).

use crate::aggregate::Declaration;
use crate::config::Config;
use crate::descriptor::ReportDescriptor;
use crate::Duration;

pub const ROWS: usize = 6;
pub const COLS: usize = 6;
pub const DEDICATED: [&str; 1] = ["escape"];
pub const ENCODERS: usize = 5;

pub const DECLARATION: Declaration = Declaration {
    rows: ROWS,
    cols: COLS,
    dedicated: &DEDICATED,
    encoders: ENCODERS,
};

/// The host sees 64 buttons; the 17 past the declared ones never press.
pub const REPORT_BUTTONS: u8 = 64;
pub const REPORT_ID: u8 = 1;
pub const DESCRIPTOR: ReportDescriptor = ReportDescriptor::joystick(REPORT_BUTTONS, REPORT_ID);

/// The encoders emit four quadrature pulses per detent.
pub const PULSES_PER_CLICK: u16 = 4;
pub const DEBOUNCE: Duration = Duration::from_ticks(20);
pub const ROW_SETTLE_US: u32 = 10;
/// Some hosts drop joystick reports that arrive faster than this.
pub const MIN_REPORT_INTERVAL: Duration = Duration::from_ticks(20);

pub const VENDOR_ID: u16 = 0xF055;
pub const PRODUCT_ID: u16 = 0x0000;
pub const MANUFACTURER: &str = "Example";
pub const PRODUCT: &str = "Button Box v1";

/// Vendor control request (host to device) that reboots into the bootloader.
pub const REQUEST_BOOTLOADER: u8 = 0xFF;

pub const fn config() -> Config {
    Config {
        debounce: DEBOUNCE,
        row_settle_us: ROW_SETTLE_US,
        pulses_per_click: PULSES_PER_CLICK,
        min_report_interval: MIN_REPORT_INTERVAL,
    }
}
