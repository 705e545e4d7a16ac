//! Fake pins, counters and transport for host-side tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, ErrorKind, ErrorType, InputPin, OutputPin};

use crate::driver::HidTransport;
use crate::encoder::PulseCounter;

/// Error returned by a fake pin or counter that was told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinFault;

impl digital::Error for PinFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// One thing that happened to the board, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Drive { row: usize, high: bool },
    Delay { ns: u64 },
    Read { col: usize },
}

#[derive(Default)]
struct BoardState {
    /// Closed switches, indexed `[row][col]`.
    closed: Vec<Vec<bool>>,
    /// Row currently driven low.
    active_row: Option<usize>,
    /// Every drive, settle delay and column read.
    trace: Vec<Event>,
    failing_row: Option<usize>,
    failing_col: Option<usize>,
}

/// A switch matrix wired between fake row and column pins.
#[derive(Clone)]
pub struct FakeMatrix(Rc<RefCell<BoardState>>);

impl FakeMatrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self(Rc::new(RefCell::new(BoardState {
            closed: vec![vec![false; cols]; rows],
            ..Default::default()
        })))
    }

    pub fn rows<const N: usize>(&self) -> [FakeRow; N] {
        core::array::from_fn(|row| FakeRow {
            board: self.clone(),
            row,
        })
    }

    pub fn cols<const N: usize>(&self) -> [FakeCol; N] {
        core::array::from_fn(|col| FakeCol {
            board: self.clone(),
            col,
        })
    }

    pub fn set(&self, row: usize, col: usize, closed: bool) {
        self.0.borrow_mut().closed[row][col] = closed;
    }

    /// A delay that records itself in the board's trace.
    pub fn delay(&self) -> FakeDelay {
        FakeDelay(self.clone())
    }

    pub fn trace(&self) -> Vec<Event> {
        self.0.borrow().trace.clone()
    }

    /// Every (row, level) written, in order.
    pub fn drives(&self) -> Vec<(usize, bool)> {
        self.trace()
            .into_iter()
            .filter_map(|event| match event {
                Event::Drive { row, high } => Some((row, high)),
                _ => None,
            })
            .collect()
    }

    pub fn active_row(&self) -> Option<usize> {
        self.0.borrow().active_row
    }

    pub fn fail_row(&self, row: usize) {
        self.0.borrow_mut().failing_row = Some(row);
    }

    pub fn fail_col(&self, col: usize) {
        self.0.borrow_mut().failing_col = Some(col);
    }
}

pub struct FakeRow {
    board: FakeMatrix,
    row: usize,
}

impl ErrorType for FakeRow {
    type Error = PinFault;
}

impl FakeRow {
    fn drive(&mut self, high: bool) -> Result<(), PinFault> {
        let mut state = self.board.0.borrow_mut();
        if state.failing_row == Some(self.row) {
            return Err(PinFault);
        }
        state.trace.push(Event::Drive { row: self.row, high });
        if !high {
            state.active_row = Some(self.row);
        } else if state.active_row == Some(self.row) {
            state.active_row = None;
        }
        Ok(())
    }
}

impl OutputPin for FakeRow {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true)
    }
}

pub struct FakeCol {
    board: FakeMatrix,
    col: usize,
}

impl ErrorType for FakeCol {
    type Error = PinFault;
}

impl InputPin for FakeCol {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.is_low().map(|low| !low)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        let mut state = self.board.0.borrow_mut();
        if state.failing_col == Some(self.col) {
            return Err(PinFault);
        }
        state.trace.push(Event::Read { col: self.col });
        // Pulled up unless a closed switch connects it to the driven row.
        Ok(state
            .active_row
            .is_some_and(|row| state.closed[row][self.col]))
    }
}

/// Shared level and fault flag behind a [`FakeInput`] or [`FakeCounter`].
#[derive(Clone, Default)]
pub struct Handle<T: Copy> {
    value: Rc<Cell<T>>,
    failing: Rc<Cell<bool>>,
}

impl<T: Copy> Handle<T> {
    pub fn set(&self, value: T) {
        self.value.set(value);
    }

    pub fn fail(&self) {
        self.failing.set(true);
    }

    fn read(&self) -> Result<T, PinFault> {
        if self.failing.get() {
            Err(PinFault)
        } else {
            Ok(self.value.get())
        }
    }
}

/// A button wired from a pulled-up pin to ground.
pub struct FakeInput(Handle<bool>);

impl FakeInput {
    pub fn released() -> Self {
        Self(Handle::default())
    }

    /// Controls whether the button is pressed.
    pub fn handle(&self) -> Handle<bool> {
        self.0.clone()
    }
}

impl ErrorType for FakeInput {
    type Error = PinFault;
}

impl InputPin for FakeInput {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.0.read().map(|pressed| !pressed)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.0.read()
    }
}

pub struct FakeCounter(Handle<i32>);

impl FakeCounter {
    pub fn new(count: i32) -> Self {
        let handle = Handle::default();
        handle.set(count);
        Self(handle)
    }

    pub fn handle(&self) -> Handle<i32> {
        self.0.clone()
    }
}

impl PulseCounter for FakeCounter {
    type Error = PinFault;

    fn count(&mut self) -> Result<i32, Self::Error> {
        self.0.read()
    }
}

#[derive(Default)]
struct TransportState {
    sent: Vec<Vec<u8>>,
    busy: bool,
    broken: bool,
}

/// Records every report it accepts.
#[derive(Clone)]
pub struct FakeTransport {
    state: Rc<RefCell<TransportState>>,
    report_len: usize,
}

impl FakeTransport {
    pub fn new(report_len: usize) -> Self {
        Self {
            state: Rc::default(),
            report_len,
        }
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.state.borrow().sent.clone()
    }

    pub fn set_busy(&self, busy: bool) {
        self.state.borrow_mut().busy = busy;
    }

    pub fn set_broken(&self, broken: bool) {
        self.state.borrow_mut().broken = broken;
    }
}

impl HidTransport for FakeTransport {
    type Error = PinFault;

    fn report_len(&self) -> usize {
        self.report_len
    }

    fn send_report(&mut self, report: &[u8]) -> nb::Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.busy {
            return Err(nb::Error::WouldBlock);
        }
        if state.broken {
            return Err(nb::Error::Other(PinFault));
        }
        state.sent.push(report.to_vec());
        Ok(())
    }
}

/// Settle delays take no time in tests.
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

pub struct FakeDelay(FakeMatrix);

impl FakeDelay {
    fn record(&mut self, ns: u64) {
        (self.0).0.borrow_mut().trace.push(Event::Delay { ns });
    }
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.record(u64::from(ns));
    }

    fn delay_us(&mut self, us: u32) {
        self.record(u64::from(us) * 1_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.record(u64::from(ms) * 1_000_000);
    }
}
