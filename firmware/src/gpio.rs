//! Port/bit pins over the ATmega32U4 port registers.
//!
//! Each pin touches only its own bit with a read-modify-write, so pins on the
//! same port can be owned by different parts of the firmware. The Timer0
//! interrupt only reads PINx, which never races those writes.

use core::convert::Infallible;

use avr_device::atmega32u4::Peripherals;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Port {
    B,
    C,
    D,
    E,
    F,
}

impl Port {
    /// Current input levels of the whole port.
    pub fn read(self) -> u8 {
        let dp = unsafe { Peripherals::steal() };
        match self {
            Port::B => dp.PORTB.pinb.read().bits(),
            Port::C => dp.PORTC.pinc.read().bits(),
            Port::D => dp.PORTD.pind.read().bits(),
            Port::E => dp.PORTE.pine.read().bits(),
            Port::F => dp.PORTF.pinf.read().bits(),
        }
    }

    fn set_ddr(self, mask: u8, output: bool) {
        let dp = unsafe { Peripherals::steal() };
        let bits = |r: u8| if output { r | mask } else { r & !mask };
        match self {
            Port::B => dp.PORTB.ddrb.modify(|r, w| unsafe { w.bits(bits(r.bits())) }),
            Port::C => dp.PORTC.ddrc.modify(|r, w| unsafe { w.bits(bits(r.bits())) }),
            Port::D => dp.PORTD.ddrd.modify(|r, w| unsafe { w.bits(bits(r.bits())) }),
            Port::E => dp.PORTE.ddre.modify(|r, w| unsafe { w.bits(bits(r.bits())) }),
            Port::F => dp.PORTF.ddrf.modify(|r, w| unsafe { w.bits(bits(r.bits())) }),
        }
    }

    /// Output level, or pull-up enable for inputs.
    fn set_port(self, mask: u8, high: bool) {
        let dp = unsafe { Peripherals::steal() };
        let bits = |r: u8| if high { r | mask } else { r & !mask };
        match self {
            Port::B => dp.PORTB.portb.modify(|r, w| unsafe { w.bits(bits(r.bits())) }),
            Port::C => dp.PORTC.portc.modify(|r, w| unsafe { w.bits(bits(r.bits())) }),
            Port::D => dp.PORTD.portd.modify(|r, w| unsafe { w.bits(bits(r.bits())) }),
            Port::E => dp.PORTE.porte.modify(|r, w| unsafe { w.bits(bits(r.bits())) }),
            Port::F => dp.PORTF.portf.modify(|r, w| unsafe { w.bits(bits(r.bits())) }),
        }
    }
}

/// An unconfigured pin.
pub struct Pin {
    port: Port,
    mask: u8,
}

impl Pin {
    pub const fn new(port: Port, bit: u8) -> Self {
        Self {
            port,
            mask: 1 << bit,
        }
    }

    /// Output, driven high before the direction changes so the pin never
    /// glitches low.
    pub fn into_output_high(self) -> Output {
        self.port.set_port(self.mask, true);
        self.port.set_ddr(self.mask, true);
        Output(self)
    }

    pub fn into_pull_up_input(self) -> Input {
        self.port.set_ddr(self.mask, false);
        self.port.set_port(self.mask, true);
        Input(self)
    }
}

pub struct Output(Pin);

impl ErrorType for Output {
    type Error = Infallible;
}

impl OutputPin for Output {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.port.set_port(self.0.mask, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.port.set_port(self.0.mask, true);
        Ok(())
    }
}

pub struct Input(Pin);

impl ErrorType for Input {
    type Error = Infallible;
}

impl InputPin for Input {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.port.read() & self.0.mask != 0)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}
