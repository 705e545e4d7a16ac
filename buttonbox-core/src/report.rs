//! Bit-packed joystick input reports.
//!
//! Byte 0 holds buttons 1-8 (LSB is button 1), byte 1 buttons 9-16, and so
//! on. Bits past the last logical button are always 0.

use heapless::Vec;

use crate::MAX_REPORT_LEN;

/// One input report, without the report ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    bytes: Vec<u8, MAX_REPORT_LEN>,
}

impl Report {
    /// All buttons released.
    pub fn released(report_len: usize) -> Self {
        let mut bytes = Vec::new();
        bytes.resize(report_len.min(MAX_REPORT_LEN), 0).ok();
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_pressed(&self, index: usize) -> bool {
        self.bytes
            .get(index / 8)
            .is_some_and(|byte| byte & (1 << (index % 8)) != 0)
    }
}

/// Pack `buttons` into a `report_len`-byte report.
///
/// Buttons that do not fit are dropped; startup validation makes sure a
/// configured device never declares more buttons than its report holds.
pub fn encode(buttons: &[bool], report_len: usize) -> Report {
    let mut report = Report::released(report_len);
    let capacity = report.bytes.len() * 8;

    for (index, _) in buttons
        .iter()
        .take(capacity)
        .enumerate()
        .filter(|&(_, &pressed)| pressed)
    {
        report.bytes[index / 8] |= 1 << (index % 8);
    }

    report
}

/// Read the first `count` button levels back out of a raw report.
pub fn unpack(bytes: &[u8], count: usize) -> impl Iterator<Item = bool> + '_ {
    (0..count.min(bytes.len() * 8)).map(move |index| bytes[index / 8] & (1 << (index % 8)) != 0)
}
