//! HID report descriptor for the joystick.
//!
//! The descriptor is generated from the same button count the report encoder
//! packs, so report layout and descriptor cannot drift apart.

/// Largest descriptor [`ReportDescriptor::joystick`] produces.
pub const MAX_DESCRIPTOR_LEN: usize = 32;

/// A joystick report descriptor: `buttons` one-bit button fields (Button 1
/// in the least significant bit of the first byte), padded to a whole byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportDescriptor {
    bytes: [u8; MAX_DESCRIPTOR_LEN],
    len: usize,
    buttons: u8,
    report_id: u8,
}

impl ReportDescriptor {
    pub const fn joystick(buttons: u8, report_id: u8) -> Self {
        let items = [
            0x05, 0x01, // Usage Page (Generic Desktop)
            0x09, 0x04, // Usage (Joystick)
            0xA1, 0x01, // Collection (Application)
            0x85, report_id, //   Report ID
            0x05, 0x09, //   Usage Page (Button)
            0x19, 0x01, //   Usage Minimum (Button 1)
            0x29, buttons, //   Usage Maximum (Button N)
            0x15, 0x00, //   Logical Minimum (0)
            0x25, 0x01, //   Logical Maximum (1)
            0x75, 0x01, //   Report Size (1)
            0x95, buttons, //   Report Count (N)
            0x81, 0x02, //   Input (Data, Variable, Absolute)
        ];

        let mut bytes = [0u8; MAX_DESCRIPTOR_LEN];
        let mut len = 0;
        while len < items.len() {
            bytes[len] = items[len];
            len += 1;
        }

        let padding = (8 - buttons % 8) % 8;
        if padding != 0 {
            let pad = [
                0x75, padding, //   Report Size (padding)
                0x95, 0x01, //   Report Count (1)
                0x81, 0x01, //   Input (Constant)
            ];
            let mut i = 0;
            while i < pad.len() {
                bytes[len] = pad[i];
                len += 1;
                i += 1;
            }
        }

        bytes[len] = 0xC0; // End Collection
        len += 1;

        Self {
            bytes,
            len,
            buttons,
            report_id,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn buttons(&self) -> usize {
        self.buttons as usize
    }

    pub const fn report_id(&self) -> u8 {
        self.report_id
    }

    /// Input report length in bytes, not counting the report ID.
    pub const fn report_len(&self) -> usize {
        (self.buttons as usize).div_ceil(8)
    }
}
