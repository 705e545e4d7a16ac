//! Live view of the buttons the host sees.

use anyhow::{Context, Result};
use buttonbox_core::{layout, report};
use indicatif::{ProgressBar, ProgressStyle};
use rusb::{DeviceHandle, GlobalContext};
use std::time::Duration;

use crate::device;

const READ_TIMEOUT: Duration = Duration::from_millis(200);

/// Zero-based indices of the pressed buttons in one interrupt packet
/// (report ID followed by the report), or `None` if the packet is not a
/// button box input report.
pub fn pressed_buttons(packet: &[u8]) -> Option<Vec<usize>> {
    let (&id, report) = packet.split_first()?;
    if id != layout::REPORT_ID || report.len() != layout::DESCRIPTOR.report_len() {
        return None;
    }

    let count = layout::DECLARATION.button_count();
    Some(
        report::unpack(report, count)
            .enumerate()
            .filter(|&(_, pressed)| pressed)
            .map(|(index, _)| index)
            .collect(),
    )
}

/// Button numbers as the host numbers them (from 1), with their roles.
pub fn describe(pressed: &[usize]) -> String {
    if pressed.is_empty() {
        return "no buttons pressed".to_string();
    }

    pressed
        .iter()
        .map(|&index| match layout::DECLARATION.role(index) {
            Some(role) => format!("{} ({})", index + 1, role),
            None => (index + 1).to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Print every report until reading fails (e.g. the device is unplugged).
pub fn run(handle: &DeviceHandle<GlobalContext>) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .context("invalid spinner template")?,
    );
    spinner.set_message("waiting for input");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let mut packet = [0u8; 64];
    loop {
        match handle.read_interrupt(device::REPORT_ENDPOINT, &mut packet, READ_TIMEOUT) {
            Ok(len) => match pressed_buttons(&packet[..len]) {
                Some(pressed) => spinner.set_message(describe(&pressed)),
                None => spinner.println(format!("ignoring packet {:02x?}", &packet[..len])),
            },
            Err(rusb::Error::Timeout) => {}
            Err(err) => {
                spinner.finish_and_clear();
                return Err(err).context("failed to read input report");
            }
        }
    }
}
