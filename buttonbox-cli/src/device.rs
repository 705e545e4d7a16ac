use anyhow::{bail, Context, Result};
use buttonbox_core::layout;
use rusb::{Device, DeviceHandle, GlobalContext};
use std::time::Duration;

/// Teensy 2.0 HalfKay bootloader USB identifiers.
const HALFKAY_VID: u16 = 0x16C0;
const HALFKAY_PID: u16 = 0x0478;

/// USB control transfer timeout.
const USB_TIMEOUT: Duration = Duration::from_secs(2);

/// The joystick interface and its interrupt IN endpoint.
pub const INTERFACE: u8 = 0;
pub const REPORT_ENDPOINT: u8 = 0x81;

fn find(vid: u16, pid: u16) -> Result<Option<Device<GlobalContext>>> {
    let devices = rusb::devices().context("failed to enumerate USB devices")?;
    for device in devices.iter() {
        let desc = device
            .device_descriptor()
            .context("failed to read device descriptor")?;
        if desc.vendor_id() == vid && desc.product_id() == pid {
            return Ok(Some(device));
        }
    }
    Ok(None)
}

/// The attached button box, if any.
pub fn button_box() -> Result<Option<Device<GlobalContext>>> {
    find(layout::VENDOR_ID, layout::PRODUCT_ID)
}

/// Whether a Teensy is waiting in its HalfKay bootloader.
pub fn bootloader_present() -> Result<bool> {
    Ok(find(HALFKAY_VID, HALFKAY_PID)?.is_some())
}

/// Open the button box.
pub fn open() -> Result<DeviceHandle<GlobalContext>> {
    let Some(device) = button_box()? else {
        bail!(
            "{} not found (looking for {:04x}:{:04x})",
            layout::PRODUCT,
            layout::VENDOR_ID,
            layout::PRODUCT_ID
        );
    };
    device
        .open()
        .context("failed to open button box (may need root/sudo or udev rules)")
}

/// Take the joystick interface away from the OS HID driver.
pub fn claim(handle: &mut DeviceHandle<GlobalContext>) -> Result<()> {
    // Not supported on every platform; claiming reports the real problem.
    let _ = handle.set_auto_detach_kernel_driver(true);
    handle
        .claim_interface(INTERFACE)
        .context("failed to claim the joystick interface")
}

/// Ask the firmware to reboot into the bootloader.
pub fn reboot_to_bootloader(handle: &DeviceHandle<GlobalContext>) -> Result<()> {
    // bmRequestType 0x40: host-to-device, vendor, device
    match handle.write_control(0x40, layout::REQUEST_BOOTLOADER, 0, 0, &[], USB_TIMEOUT) {
        // The device may drop off the bus before the status stage completes.
        Ok(_) | Err(rusb::Error::NoDevice) | Err(rusb::Error::Io) | Err(rusb::Error::Pipe) => {
            Ok(())
        }
        Err(err) => Err(err).context("bootloader request failed"),
    }
}

/// Poll for the HalfKay bootloader for up to `timeout`.
pub fn wait_for_bootloader(timeout: Duration) -> Result<bool> {
    let step = Duration::from_millis(100);
    let mut waited = Duration::ZERO;
    while waited < timeout {
        if bootloader_present()? {
            return Ok(true);
        }
        std::thread::sleep(step);
        waited += step;
    }
    bootloader_present()
}
