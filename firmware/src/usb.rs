//! USB HID joystick on the ATmega32U4's USB controller.
//!
//! Polled from the main loop: no USB interrupts are enabled. Control
//! transfers on EP0 answer enumeration; input reports go out on EP1 IN as
//! the report ID followed by the packed buttons.

use core::convert::Infallible;

use avr_device::atmega32u4::{Peripherals, PLL, USB_DEVICE};
use buttonbox_core::descriptor::ReportDescriptor;
use buttonbox_core::{layout, HidTransport};

const EP0_SIZE: u8 = 64;
/// Report ID plus up to 15 report bytes in one packet.
const EP1_SIZE: u8 = 16;

static REPORT_DESCRIPTOR: ReportDescriptor = layout::DESCRIPTOR;

const VID: [u8; 2] = layout::VENDOR_ID.to_le_bytes();
const PID: [u8; 2] = layout::PRODUCT_ID.to_le_bytes();

static DEVICE_DESCRIPTOR: [u8; 18] = [
    18,   // bLength
    1,    // bDescriptorType (Device)
    0x00, 0x02, // bcdUSB (2.0)
    0,    // bDeviceClass (per interface)
    0,    // bDeviceSubClass
    0,    // bDeviceProtocol
    EP0_SIZE, // bMaxPacketSize0
    VID[0], VID[1], // idVendor
    PID[0], PID[1], // idProduct
    0x00, 0x01, // bcdDevice (1.0)
    1,    // iManufacturer
    2,    // iProduct
    0,    // iSerialNumber
    1,    // bNumConfigurations
];

const HID_DESCRIPTOR_OFFSET: usize = 18;

static CONFIG_DESCRIPTOR: [u8; 34] = [
    9,    // bLength
    2,    // bDescriptorType (Configuration)
    34, 0, // wTotalLength
    1,    // bNumInterfaces
    1,    // bConfigurationValue
    0,    // iConfiguration
    0x80, // bmAttributes (bus powered)
    50,   // bMaxPower (100 mA)
    // Interface
    9,    // bLength
    4,    // bDescriptorType (Interface)
    0,    // bInterfaceNumber
    0,    // bAlternateSetting
    1,    // bNumEndpoints
    3,    // bInterfaceClass (HID)
    0,    // bInterfaceSubClass (none)
    0,    // bInterfaceProtocol (none)
    0,    // iInterface
    // HID
    9,    // bLength
    0x21, // bDescriptorType (HID)
    0x11, 0x01, // bcdHID (1.11)
    0,    // bCountryCode
    1,    // bNumDescriptors
    0x22, // bDescriptorType (Report)
    layout::DESCRIPTOR.len() as u8, 0, // wDescriptorLength
    // EP1 IN
    7,    // bLength
    5,    // bDescriptorType (Endpoint)
    0x81, // bEndpointAddress
    0x03, // bmAttributes (Interrupt)
    EP1_SIZE, 0, // wMaxPacketSize
    1,    // bInterval (1 ms)
];

static STRING_LANGUAGES: [u8; 4] = [4, 3, 0x09, 0x04]; // English (US)

const MANUFACTURER_LEN: usize = 2 + 2 * layout::MANUFACTURER.len();
static STRING_MANUFACTURER: [u8; MANUFACTURER_LEN] = string_descriptor(layout::MANUFACTURER);

const PRODUCT_LEN: usize = 2 + 2 * layout::PRODUCT.len();
static STRING_PRODUCT: [u8; PRODUCT_LEN] = string_descriptor(layout::PRODUCT);

/// UTF-16LE string descriptor for an ASCII string.
const fn string_descriptor<const N: usize>(text: &str) -> [u8; N] {
    let ascii = text.as_bytes();
    let mut out = [0u8; N];
    out[0] = N as u8;
    out[1] = 3;
    let mut i = 0;
    while i < ascii.len() {
        out[2 + 2 * i] = ascii[i];
        i += 1;
    }
    out
}

/// The USB controller, owned by the transport.
pub struct UsbJoystick {
    usb: USB_DEVICE,
    configured: bool,
}

impl UsbJoystick {
    pub fn new(usb: USB_DEVICE) -> Self {
        Self {
            usb,
            configured: false,
        }
    }

    /// Start the USB PLL and attach to the bus.
    pub fn init(&mut self, pll: &PLL) {
        let usb = &self.usb;

        usb.uhwcon.write(|w| w.uvrege().set_bit());
        usb.usbcon.write(|w| w.usbe().set_bit().otgpade().set_bit());

        // 16 MHz crystal -> 48 MHz USB clock
        pll.pllcsr.write(|w| w.pindiv().set_bit().plle().set_bit());
        while pll.pllcsr.read().plock().bit_is_clear() {}

        usb.usbcon.modify(|_, w| w.frzclk().clear_bit());
        usb.udcon.modify(|_, w| w.detach().clear_bit());

        self.configured = false;
    }

    /// Handle bus resets and control requests. Call every loop iteration.
    ///
    /// Returns true when the host has just configured the device, after
    /// enumeration or a bus reset. The host then knows nothing of the
    /// current button state.
    pub fn poll(&mut self) -> bool {
        let was_configured = self.configured;
        if self.usb.udint.read().eorsti().bit_is_set() {
            self.usb.udint.modify(|_, w| w.eorsti().clear_bit());
            self.configure_ep0();
            self.configured = false;
        }

        self.select_endpoint(0);
        if self.usb.ueintx.read().rxstpi().bit_is_set() {
            self.handle_setup();
        }
        !was_configured && self.configured
    }

    fn configure_ep0(&self) {
        self.select_endpoint(0);
        self.usb.ueconx.write(|w| w.epen().set_bit());
        self.usb.uecfg0x.write(|w| w.eptype().bits(0b00));
        self.usb
            .uecfg1x
            .write(|w| w.epsize().bits(0b011).alloc().set_bit());
    }

    fn configure_ep1(&self) {
        self.select_endpoint(1);
        self.usb.ueconx.write(|w| w.epen().set_bit());
        self.usb
            .uecfg0x
            .write(|w| w.eptype().bits(0b11).epdir().set_bit());
        // 16 bytes
        self.usb
            .uecfg1x
            .write(|w| w.epsize().bits(0b001).alloc().set_bit());
    }

    fn select_endpoint(&self, ep: u8) {
        self.usb.uenum.write(|w| w.bits(ep & 0x07));
    }

    fn handle_setup(&mut self) {
        let usb = &self.usb;

        let request_type = usb.uedatx.read().bits();
        let request = usb.uedatx.read().bits();
        let value_low = usb.uedatx.read().bits();
        let value_high = usb.uedatx.read().bits();
        let _index_low = usb.uedatx.read().bits();
        let _index_high = usb.uedatx.read().bits();
        let length_low = usb.uedatx.read().bits();
        let length_high = usb.uedatx.read().bits();
        let length = u16::from(length_high) << 8 | u16::from(length_low);

        usb.ueintx.modify(|_, w| w.rxstpi().clear_bit());

        match (request_type, request) {
            // GET_DESCRIPTOR (device)
            (0x80, 0x06) => match (value_high, value_low) {
                (1, _) => self.send_descriptor(&DEVICE_DESCRIPTOR, length),
                (2, _) => self.send_descriptor(&CONFIG_DESCRIPTOR, length),
                (3, 0) => self.send_descriptor(&STRING_LANGUAGES, length),
                (3, 1) => self.send_descriptor(&STRING_MANUFACTURER, length),
                (3, 2) => self.send_descriptor(&STRING_PRODUCT, length),
                _ => self.stall(),
            },

            // GET_DESCRIPTOR (interface): HID class and report descriptors
            (0x81, 0x06) => match value_high {
                0x21 => self.send_descriptor(
                    &CONFIG_DESCRIPTOR[HID_DESCRIPTOR_OFFSET..HID_DESCRIPTOR_OFFSET + 9],
                    length,
                ),
                0x22 => self.send_descriptor(REPORT_DESCRIPTOR.as_bytes(), length),
                _ => self.stall(),
            },

            // SET_ADDRESS: status stage first, then enable the address
            (0x00, 0x05) => {
                self.send_status();
                while usb.ueintx.read().txini().bit_is_clear() {}
                usb.udaddr
                    .write(|w| w.uadd().bits(value_low & 0x7F).adden().set_bit());
            }

            // SET_CONFIGURATION
            (0x00, 0x09) => {
                self.send_status();
                self.configure_ep1();
                self.configured = value_low != 0;
            }

            // GET_CONFIGURATION
            (0x80, 0x08) => {
                while usb.ueintx.read().txini().bit_is_clear() {}
                usb.uedatx.write(|w| w.bits(u8::from(self.configured)));
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
            }

            // HID SET_IDLE
            (0x21, 0x0A) => self.send_status(),

            (0x40, layout::REQUEST_BOOTLOADER) => {
                self.send_status();
                jump_to_bootloader();
            }

            _ => self.stall(),
        }
    }

    /// Zero-length IN packet for the status stage.
    fn send_status(&self) {
        self.usb.ueintx.modify(|_, w| w.txini().clear_bit());
    }

    fn send_descriptor(&self, descriptor: &[u8], max_length: u16) {
        let usb = &self.usb;
        let len = descriptor.len().min(usize::from(max_length));

        for chunk in descriptor[..len].chunks(usize::from(EP0_SIZE)) {
            while usb.ueintx.read().txini().bit_is_clear() {}
            for &byte in chunk {
                usb.uedatx.write(|w| w.bits(byte));
            }
            usb.ueintx.modify(|_, w| w.txini().clear_bit());
        }

        // Status stage: the host answers with a zero-length OUT.
        while usb.ueintx.read().rxouti().bit_is_clear() {}
        usb.ueintx.modify(|_, w| w.rxouti().clear_bit());
    }

    fn stall(&self) {
        self.usb.ueconx.modify(|_, w| w.stallrq().set_bit());
    }
}

impl HidTransport for UsbJoystick {
    type Error = Infallible;

    fn report_len(&self) -> usize {
        REPORT_DESCRIPTOR.report_len()
    }

    fn send_report(&mut self, report: &[u8]) -> nb::Result<(), Self::Error> {
        if !self.configured {
            return Err(nb::Error::WouldBlock);
        }

        self.select_endpoint(1);
        if self.usb.ueintx.read().rwal().bit_is_clear() {
            return Err(nb::Error::WouldBlock);
        }

        self.usb.uedatx.write(|w| w.bits(REPORT_DESCRIPTOR.report_id()));
        for &byte in report {
            self.usb.uedatx.write(|w| w.bits(byte));
        }
        self.usb
            .ueintx
            .modify(|_, w| w.fifocon().clear_bit().txini().clear_bit());

        Ok(())
    }
}

/// Detach from USB, quiesce every peripheral and jump to the HalfKay
/// bootloader at 0x7E00.
pub fn jump_to_bootloader() -> ! {
    avr_device::interrupt::disable();
    let dp = unsafe { Peripherals::steal() };

    dp.USB_DEVICE.udcon.write(|w| w.detach().set_bit());
    dp.USB_DEVICE.usbcon.write(|w| w.frzclk().set_bit());

    // Give the host time to see the disconnect.
    for _ in 0..20000u16 {
        unsafe { core::arch::asm!("nop") };
    }

    dp.EXINT.eimsk.write(|w| w.bits(0));
    dp.SPI.spcr.write(|w| unsafe { w.bits(0) });
    dp.AC.acsr.write(|w| unsafe { w.bits(0) });
    dp.EEPROM.eecr.write(|w| unsafe { w.bits(0) });
    dp.ADC.adcsra.write(|w| unsafe { w.bits(0) });
    dp.TC0.timsk0.write(|w| unsafe { w.bits(0) });
    dp.TC1.timsk1.write(|w| unsafe { w.bits(0) });
    dp.TC3.timsk3.write(|w| unsafe { w.bits(0) });
    dp.TC4.timsk4.write(|w| unsafe { w.bits(0) });
    dp.USART1.ucsr1b.write(|w| unsafe { w.bits(0) });
    dp.TWI.twcr.write(|w| unsafe { w.bits(0) });

    dp.PORTB.ddrb.write(|w| unsafe { w.bits(0) });
    dp.PORTB.portb.write(|w| unsafe { w.bits(0) });
    dp.PORTC.ddrc.write(|w| unsafe { w.bits(0) });
    dp.PORTC.portc.write(|w| unsafe { w.bits(0) });
    dp.PORTD.ddrd.write(|w| unsafe { w.bits(0) });
    dp.PORTD.portd.write(|w| unsafe { w.bits(0) });
    dp.PORTE.ddre.write(|w| unsafe { w.bits(0) });
    dp.PORTE.porte.write(|w| unsafe { w.bits(0) });
    dp.PORTF.ddrf.write(|w| unsafe { w.bits(0) });
    dp.PORTF.portf.write(|w| unsafe { w.bits(0) });

    unsafe { core::arch::asm!("jmp 0x7E00", options(noreturn)) }
}
