//! Button Box v1 firmware for ATmega32U4 (Teensy 2.0).
//!
//! Scans a 6x6 button matrix, the escape button and five rotary encoders
//! once per millisecond and reports them to the host as a 64-button USB HID
//! joystick.
//!
//! Holding escape while plugging in reboots into the HalfKay bootloader.

#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]
#![feature(asm_experimental_arch)]

mod clock;
mod gpio;
mod usb;

use avr_device::atmega32u4::Peripherals;
use buttonbox_core::{layout, ButtonBox, DirectPins, Encoders, Matrix};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use clock::BusyDelay;
use gpio::{Output, Pin, Port};
use usb::UsbJoystick;

#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

#[no_mangle]
pub extern "C" fn main() -> ! {
    let dp = unsafe { Peripherals::steal() };

    // Prescaler 1: run at the full 16 MHz.
    dp.CPU.clkpr.write(|w| w.clkpce().set_bit());
    dp.CPU.clkpr.write(|w| unsafe { w.bits(0) });

    // On-board LED: lit while running.
    let mut led = Pin::new(Port::D, 6).into_output_high();

    let mut escape = Pin::new(Port::E, 6).into_pull_up_input();
    BusyDelay.delay_us(10);
    if matches!(escape.is_low(), Ok(true)) {
        usb::jump_to_bootloader();
    }

    let rows = [
        Pin::new(Port::D, 0),
        Pin::new(Port::D, 1),
        Pin::new(Port::D, 2),
        Pin::new(Port::D, 3),
        Pin::new(Port::D, 4),
        Pin::new(Port::D, 5),
    ]
    .map(Pin::into_output_high);
    let cols = [
        Pin::new(Port::F, 0),
        Pin::new(Port::F, 1),
        Pin::new(Port::F, 4),
        Pin::new(Port::F, 5),
        Pin::new(Port::F, 6),
        Pin::new(Port::F, 7),
    ]
    .map(Pin::into_pull_up_input);

    clock::start(&dp.TC0);

    let mut usb = UsbJoystick::new(dp.USB_DEVICE);
    usb.init(&dp.PLL);

    unsafe { avr_device::interrupt::enable() };

    let config = layout::config();
    let Ok(matrix) = Matrix::new(rows, cols, config.debounce, config.row_settle_us) else {
        halt(&mut led);
    };
    let pins = DirectPins::new(layout::DEDICATED, [escape], config.debounce);
    let Ok(encoders) = Encoders::new(clock::counters(), config.pulses_per_click) else {
        halt(&mut led);
    };
    let Ok(mut device) = ButtonBox::new(
        matrix,
        pins,
        encoders,
        usb,
        layout::DECLARATION,
        &layout::DESCRIPTOR,
        &config,
    ) else {
        halt(&mut led);
    };

    let mut delay = BusyDelay;
    let mut now = clock::now();
    loop {
        if device.transport_mut().poll() {
            device.resync();
        }

        if device.read_and_report(now, &mut delay).is_err() {
            halt(&mut led);
        }

        now = clock::wait_tick(now);
    }
}

/// Stop with the LED off. Only a power cycle gets out of here.
fn halt(led: &mut Output) -> ! {
    let _ = led.set_low();
    loop {}
}
