//! Timer0 tick: the millisecond clock and encoder sampling.
//!
//! Timer0 runs in CTC mode at 8 kHz (16 MHz / 8 / 250). Each interrupt
//! samples every encoder's A/B lines into its quadrature decoder; every
//! eighth one advances the millisecond count. The main loop reads both
//! through critical sections.

use core::cell::{Cell, RefCell};
use core::convert::Infallible;

use avr_device::atmega32u4::TC0;
use avr_device::interrupt::{self, Mutex};
use buttonbox_core::layout::ENCODERS;
use buttonbox_core::{Instant, PulseCounter, QuadratureDecoder};
use embedded_hal::delay::DelayNs;

use crate::gpio::{Pin, Port};

const COMPARE: u8 = 249;
const TICKS_PER_MS: u8 = 8;

/// (port, A bit, B bit) per encoder, in declaration order.
const ENCODER_PINS: [(Port, u8, u8); ENCODERS] = [
    (Port::B, 0, 1),
    (Port::B, 2, 3),
    (Port::B, 4, 5),
    (Port::B, 6, 7),
    (Port::C, 6, 7),
];

const IDLE: QuadratureDecoder = QuadratureDecoder::new(true, true);

static MILLIS: Mutex<Cell<u32>> = Mutex::new(Cell::new(0));
static SUBTICKS: Mutex<Cell<u8>> = Mutex::new(Cell::new(0));
static DECODERS: Mutex<RefCell<[QuadratureDecoder; ENCODERS]>> =
    Mutex::new(RefCell::new([IDLE; ENCODERS]));

/// Configure the encoder inputs and start the tick. Interrupts must be
/// enabled by the caller.
pub fn start(tc0: &TC0) {
    for &(port, a, b) in &ENCODER_PINS {
        Pin::new(port, a).into_pull_up_input();
        Pin::new(port, b).into_pull_up_input();
    }
    // Pull-ups need a moment before the first sample means anything.
    BusyDelay.delay_us(10);

    interrupt::free(|cs| {
        let mut decoders = DECODERS.borrow(cs).borrow_mut();
        for (decoder, (a, b)) in decoders.iter_mut().zip(sample_encoders()) {
            *decoder = QuadratureDecoder::new(a, b);
        }
    });

    tc0.tccr0a.write(|w| w.wgm0().ctc());
    tc0.ocr0a.write(|w| w.bits(COMPARE));
    tc0.tccr0b.write(|w| w.cs0().prescale_8());
    tc0.timsk0.write(|w| w.ocie0a().set_bit());
}

fn sample_encoders() -> [(bool, bool); ENCODERS] {
    ENCODER_PINS.map(|(port, a, b)| {
        let levels = port.read();
        (levels & (1 << a) != 0, levels & (1 << b) != 0)
    })
}

#[avr_device::interrupt(atmega32u4)]
fn TIMER0_COMPA() {
    let levels = sample_encoders();

    interrupt::free(|cs| {
        let mut decoders = DECODERS.borrow(cs).borrow_mut();
        for (decoder, (a, b)) in decoders.iter_mut().zip(levels) {
            decoder.update(a, b);
        }

        let subticks = SUBTICKS.borrow(cs);
        let next = subticks.get() + 1;
        if next < TICKS_PER_MS {
            subticks.set(next);
        } else {
            subticks.set(0);
            let millis = MILLIS.borrow(cs);
            millis.set(millis.get().wrapping_add(1));
        }
    });
}

/// Milliseconds since [`start`], wrapping after about 49 days.
pub fn now() -> Instant {
    Instant::from_ticks(interrupt::free(|cs| MILLIS.borrow(cs).get()))
}

/// Spin until the millisecond count moves past `since`.
pub fn wait_tick(since: Instant) -> Instant {
    loop {
        let now = now();
        if now != since {
            return now;
        }
    }
}

/// One encoder's decoder, read from the main loop.
pub struct EncoderCounter {
    index: usize,
}

pub fn counters() -> [EncoderCounter; ENCODERS] {
    core::array::from_fn(|index| EncoderCounter { index })
}

impl PulseCounter for EncoderCounter {
    type Error = Infallible;

    fn count(&mut self) -> Result<i32, Self::Error> {
        Ok(interrupt::free(|cs| {
            DECODERS.borrow(cs).borrow()[self.index].count()
        }))
    }
}

/// Cycle-counting delay for short waits like row settling.
pub struct BusyDelay;

/// One `nop` loop iteration at 16 MHz, roughly.
const NS_PER_LOOP: u32 = 250;

impl DelayNs for BusyDelay {
    fn delay_ns(&mut self, ns: u32) {
        for _ in 0..ns.div_ceil(NS_PER_LOOP) {
            unsafe { core::arch::asm!("nop") };
        }
    }
}
