//! The scan -> aggregate -> encode -> send cycle.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::aggregate::{Aggregator, Declaration};
use crate::config::Config;
use crate::descriptor::ReportDescriptor;
use crate::direct::DirectPins;
use crate::encoder::{Encoders, PulseCounter};
use crate::error::{ConfigError, Error};
use crate::matrix::Matrix;
use crate::report::{self, Report};
use crate::{Instant, MAX_BUTTONS};

/// Delivers input reports to the USB host.
pub trait HidTransport {
    type Error: core::fmt::Debug;

    /// Input report length registered with the host, without the report ID.
    fn report_len(&self) -> usize;

    /// Queue one report. Must not wait: return `WouldBlock` when the host or
    /// endpoint is not ready to take it.
    fn send_report(&mut self, report: &[u8]) -> nb::Result<(), Self::Error>;
}

/// What happened to this cycle's report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the transport.
    Sent,
    /// Same as the last report the host received; nothing sent.
    Unchanged,
    /// Changed, but the minimum report interval has not passed yet.
    Deferred,
    /// The transport was busy or failed; retried next cycle.
    Dropped,
}

impl Delivery {
    /// Whether the host now holds this cycle's state.
    pub fn is_delivered(self) -> bool {
        matches!(self, Delivery::Sent | Delivery::Unchanged)
    }
}

/// Owns every input and its state, and runs one report cycle per call.
pub struct ButtonBox<
    R,
    C,
    P,
    Q,
    T,
    const ROWS: usize,
    const COLS: usize,
    const PINS: usize,
    const ENCODERS: usize,
> {
    matrix: Matrix<R, C, ROWS, COLS>,
    pins: DirectPins<P, PINS>,
    encoders: Encoders<Q, ENCODERS>,
    aggregator: Aggregator<ENCODERS>,
    transport: T,
    declaration: Declaration,
    report_len: usize,
    min_report_interval: crate::Duration,
    /// Last report the host accepted and when.
    last_sent: Option<(Report, Instant)>,
    last_delivered: bool,
}

impl<R, C, P, Q, T, E, const ROWS: usize, const COLS: usize, const PINS: usize, const ENCODERS: usize>
    ButtonBox<R, C, P, Q, T, ROWS, COLS, PINS, ENCODERS>
where
    R: OutputPin<Error = E>,
    C: InputPin<Error = E>,
    P: InputPin<Error = E>,
    Q: PulseCounter<Error = E>,
    T: HidTransport,
{
    /// Assemble the device and check `declaration` against the wired inputs,
    /// the report descriptor and the transport. Every check here would
    /// otherwise fail on every single cycle.
    pub fn new(
        matrix: Matrix<R, C, ROWS, COLS>,
        pins: DirectPins<P, PINS>,
        encoders: Encoders<Q, ENCODERS>,
        transport: T,
        declaration: Declaration,
        descriptor: &ReportDescriptor,
        config: &Config,
    ) -> Result<Self, ConfigError> {
        if declaration.rows != ROWS
            || declaration.cols != COLS
            || declaration.dedicated != pins.names().as_slice()
            || declaration.encoders != ENCODERS
        {
            return Err(ConfigError::DeclarationMismatch);
        }
        if encoders.pulses_per_click() == 0 {
            return Err(ConfigError::ZeroPulsesPerClick);
        }
        validate(&declaration, descriptor, transport.report_len(), config)?;
        if encoders.pulses_per_click() != config.pulses_per_click {
            return Err(ConfigError::PulsesPerClickMismatch {
                config: config.pulses_per_click,
                encoders: encoders.pulses_per_click(),
            });
        }

        log::info!(
            "button box: {} matrix, {} dedicated, {} encoder buttons ({} of {} report buttons)",
            declaration.matrix_buttons(),
            PINS,
            ENCODERS * Declaration::ENCODER_BUTTONS,
            declaration.button_count(),
            descriptor.buttons()
        );

        Ok(Self {
            matrix,
            pins,
            encoders,
            aggregator: Aggregator::new(),
            transport,
            declaration,
            report_len: descriptor.report_len(),
            min_report_interval: config.min_report_interval,
            last_sent: None,
            last_delivered: true,
        })
    }

    /// Sample every input once, rebuild the button vector and report it.
    ///
    /// Pin faults are returned as errors. Transport trouble is not an error:
    /// the report is dropped and the next cycle sends the then-current state.
    pub fn read_and_report(
        &mut self,
        now: Instant,
        delay: &mut impl DelayNs,
    ) -> Result<Delivery, Error<E>> {
        let grid = self.matrix.scan(now, delay)?;
        let dedicated = self.pins.scan(now)?;
        let clicks = self.encoders.poll()?;

        let buttons =
            self.aggregator
                .aggregate(&grid, dedicated.levels(), &clicks, self.last_delivered);
        let report = report::encode(&buttons, self.report_len);

        let delivery = self.deliver(report, now);
        self.last_delivered = delivery.is_delivered();
        Ok(delivery)
    }

    fn deliver(&mut self, report: Report, now: Instant) -> Delivery {
        if let Some((last, sent_at)) = &self.last_sent {
            if *last == report {
                return Delivery::Unchanged;
            }
            let since = now.checked_duration_since(*sent_at);
            if since.is_some_and(|since| since < self.min_report_interval) {
                return Delivery::Deferred;
            }
        }

        match self.transport.send_report(report.as_bytes()) {
            Ok(()) => {
                log::trace!("report sent: {:02x?}", report.as_bytes());
                self.last_sent = Some((report, now));
                Delivery::Sent
            }
            Err(nb::Error::WouldBlock) => Delivery::Dropped,
            Err(nb::Error::Other(err)) => {
                log::warn!("dropping report: {:?}", err);
                Delivery::Dropped
            }
        }
    }

    pub fn declaration(&self) -> &Declaration {
        &self.declaration
    }

    /// The last report the transport accepted.
    pub fn last_report(&self) -> Option<&Report> {
        self.last_sent.as_ref().map(|(report, _)| report)
    }

    /// Forget the last report so the next cycle sends the current state even
    /// if it has not changed. Call when the host (re)configures the device:
    /// a fresh host assumes every button is released.
    pub fn resync(&mut self) {
        self.last_sent = None;
    }

    /// For transport housekeeping between cycles (e.g. USB control requests).
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

fn validate(
    declaration: &Declaration,
    descriptor: &ReportDescriptor,
    transport_len: usize,
    config: &Config,
) -> Result<(), ConfigError> {
    if config.pulses_per_click == 0 {
        return Err(ConfigError::ZeroPulsesPerClick);
    }
    if (declaration.rows == 0) != (declaration.cols == 0) {
        return Err(ConfigError::IncompleteMatrix {
            rows: declaration.rows,
            cols: declaration.cols,
        });
    }
    if descriptor.buttons() > MAX_BUTTONS {
        return Err(ConfigError::DescriptorTooLarge {
            buttons: descriptor.buttons(),
        });
    }
    if declaration.button_count() > descriptor.buttons() {
        return Err(ConfigError::TooManyButtons {
            declared: declaration.button_count(),
            capacity: descriptor.buttons(),
        });
    }
    if descriptor.report_len() != transport_len {
        return Err(ConfigError::ReportLengthMismatch {
            descriptor: descriptor.report_len(),
            transport: transport_len,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{
        FakeCol, FakeCounter, FakeInput, FakeMatrix, FakeRow, FakeTransport, Handle, NoDelay,
        PinFault,
    };
    use crate::Duration;

    type TestBox = ButtonBox<FakeRow, FakeCol, FakeInput, FakeCounter, FakeTransport, 6, 6, 1, 1>;

    const DECLARATION: Declaration = Declaration {
        rows: 6,
        cols: 6,
        dedicated: &["escape"],
        encoders: 1,
    };

    // 39 logical buttons in a 40-button report.
    const DESCRIPTOR: ReportDescriptor = ReportDescriptor::joystick(40, 1);

    struct Rig {
        board: FakeMatrix,
        escape: Handle<bool>,
        encoder: Handle<i32>,
        transport: FakeTransport,
        device: TestBox,
    }

    impl Rig {
        fn new(config: Config) -> Self {
            let board = FakeMatrix::new(6, 6);
            let escape = FakeInput::released();
            let counter = FakeCounter::new(0);
            let transport = FakeTransport::new(DESCRIPTOR.report_len());
            let (escape_handle, encoder_handle) = (escape.handle(), counter.handle());

            let device = build(
                &board,
                escape,
                counter,
                transport.clone(),
                DECLARATION,
                &DESCRIPTOR,
                config.pulses_per_click,
                &config,
            )
            .unwrap();

            Self {
                board,
                escape: escape_handle,
                encoder: encoder_handle,
                transport,
                device,
            }
        }

        fn cycle(&mut self, ms: u32) -> Delivery {
            self.device
                .read_and_report(Instant::from_ticks(ms), &mut NoDelay)
                .unwrap()
        }

        fn last_sent(&self) -> Vec<u8> {
            self.transport.sent().last().cloned().unwrap_or_default()
        }
    }

    fn build(
        board: &FakeMatrix,
        escape: FakeInput,
        counter: FakeCounter,
        transport: FakeTransport,
        declaration: Declaration,
        descriptor: &ReportDescriptor,
        encoder_pulses_per_click: u16,
        config: &Config,
    ) -> Result<TestBox, ConfigError> {
        let matrix = Matrix::new(
            board.rows(),
            board.cols(),
            config.debounce,
            config.row_settle_us,
        )
        .unwrap();
        let pins = DirectPins::new(["escape"], [escape], config.debounce);
        let encoders = Encoders::new([counter], encoder_pulses_per_click).unwrap();
        ButtonBox::new(
            matrix,
            pins,
            encoders,
            transport,
            declaration,
            descriptor,
            config,
        )
    }

    fn config_error(
        declaration: Declaration,
        descriptor: ReportDescriptor,
        transport_len: usize,
        config: Config,
    ) -> Option<ConfigError> {
        build(
            &FakeMatrix::new(6, 6),
            FakeInput::released(),
            FakeCounter::new(0),
            FakeTransport::new(transport_len),
            declaration,
            &descriptor,
            config.pulses_per_click,
            &config,
        )
        .err()
    }

    #[test]
    fn test_first_cycle_always_reports() {
        let mut rig = Rig::new(Config::new());
        assert_eq!(rig.cycle(0), Delivery::Sent);
        assert_eq!(rig.transport.sent(), vec![vec![0; 5]]);
        assert_eq!(rig.cycle(1), Delivery::Unchanged);
        assert_eq!(rig.transport.sent().len(), 1);
    }

    #[test]
    fn test_matrix_press_and_release() {
        let mut rig = Rig::new(Config::new());
        rig.cycle(0);

        rig.board.set(2, 3, true);
        assert_eq!(rig.cycle(10), Delivery::Unchanged);
        assert_eq!(rig.cycle(29), Delivery::Unchanged);
        assert_eq!(rig.cycle(30), Delivery::Sent);
        // Button index 15: byte 1, bit 7.
        assert_eq!(rig.last_sent(), vec![0x00, 0x80, 0x00, 0x00, 0x00]);
        assert!(rig.device.last_report().is_some_and(|report| report.is_pressed(15)));

        rig.board.set(2, 3, false);
        assert_eq!(rig.cycle(40), Delivery::Unchanged);
        assert_eq!(rig.cycle(60), Delivery::Sent);
        assert_eq!(rig.last_sent(), vec![0; 5]);
    }

    #[test]
    fn test_dedicated_pin_follows_matrix() {
        let mut rig = Rig::new(Config::new());
        rig.escape.set(true);
        assert_eq!(rig.cycle(0), Delivery::Sent);
        // Button index 36: byte 4, bit 4.
        assert_eq!(rig.last_sent(), vec![0, 0, 0, 0, 0x10]);
        assert_eq!(
            rig.device.declaration().role(36),
            Some(crate::ButtonRole::Dedicated("escape"))
        );
    }

    #[test]
    fn test_encoder_click_is_pressed_then_released() {
        let mut rig = Rig::new(Config::new());
        rig.encoder.set(1);
        assert_eq!(rig.cycle(0), Delivery::Sent);
        // Clockwise is index 38 (counter-clockwise is 37).
        assert_eq!(rig.last_sent(), vec![0, 0, 0, 0, 0x40]);
        assert_eq!(rig.cycle(1), Delivery::Sent);
        assert_eq!(rig.last_sent(), vec![0; 5]);
        assert_eq!(rig.cycle(2), Delivery::Unchanged);

        rig.encoder.set(-1);
        rig.cycle(3);
        assert_eq!(rig.last_sent(), vec![0, 0, 0, 0, 0x20]);
    }

    #[test]
    fn test_busy_transport_retries_next_cycle() {
        let mut rig = Rig::new(Config::new());
        rig.transport.set_busy(true);
        assert_eq!(rig.cycle(0), Delivery::Dropped);
        assert!(rig.transport.sent().is_empty());
        assert!(rig.device.last_report().is_none());

        rig.transport.set_busy(false);
        assert_eq!(rig.cycle(1), Delivery::Sent);
        assert_eq!(rig.transport.sent(), vec![vec![0; 5]]);
    }

    #[test]
    fn test_failed_transport_is_not_an_error() {
        let mut rig = Rig::new(Config::new());
        rig.transport.set_broken(true);
        assert_eq!(rig.cycle(0), Delivery::Dropped);
        rig.transport.set_broken(false);
        assert_eq!(rig.cycle(1), Delivery::Sent);
    }

    #[test]
    fn test_dropped_pulse_is_sent_again() {
        let mut rig = Rig::new(Config::new());
        rig.cycle(0);

        rig.encoder.set(1);
        rig.transport.set_busy(true);
        assert_eq!(rig.cycle(1), Delivery::Dropped);

        rig.transport.set_busy(false);
        assert_eq!(rig.cycle(2), Delivery::Sent);
        assert_eq!(rig.last_sent(), vec![0, 0, 0, 0, 0x40]);
        assert_eq!(rig.cycle(3), Delivery::Sent);
        assert_eq!(rig.last_sent(), vec![0; 5]);
    }

    #[test]
    fn test_min_report_interval_defers_without_losing_clicks() {
        let mut config = Config::new();
        config.min_report_interval = Duration::from_ticks(20);
        let mut rig = Rig::new(config);
        assert_eq!(rig.cycle(0), Delivery::Sent);

        rig.encoder.set(1);
        assert_eq!(rig.cycle(1), Delivery::Deferred);
        assert_eq!(rig.cycle(5), Delivery::Deferred);
        assert_eq!(rig.cycle(20), Delivery::Sent);
        assert_eq!(rig.last_sent(), vec![0, 0, 0, 0, 0x40]);

        assert_eq!(rig.cycle(21), Delivery::Deferred);
        assert_eq!(rig.cycle(40), Delivery::Sent);
        assert_eq!(rig.last_sent(), vec![0; 5]);
        assert_eq!(rig.transport.sent().len(), 3);
    }

    #[test]
    fn test_resync_resends_held_buttons() {
        let mut rig = Rig::new(Config::new());
        rig.escape.set(true);
        assert_eq!(rig.cycle(0), Delivery::Sent);

        // Host gone and back while the button stays held.
        rig.transport.set_busy(true);
        assert_eq!(rig.cycle(1), Delivery::Unchanged);
        rig.transport.set_busy(false);
        assert_eq!(rig.cycle(2), Delivery::Unchanged);

        rig.device.resync();
        assert_eq!(rig.cycle(3), Delivery::Sent);
        assert_eq!(rig.last_sent(), vec![0, 0, 0, 0, 0x10]);
        assert_eq!(rig.transport.sent().len(), 2);
        assert_eq!(rig.cycle(4), Delivery::Unchanged);
    }

    #[test]
    fn test_pin_fault_is_returned() {
        let mut rig = Rig::new(Config::new());
        rig.board.fail_col(2);
        assert_eq!(
            rig.device.read_and_report(Instant::from_ticks(0), &mut NoDelay),
            Err(Error::ColumnRead {
                row: 0,
                col: 2,
                source: PinFault
            })
        );
        assert!(rig.transport.sent().is_empty());
    }

    #[test]
    fn test_counter_fault_is_returned() {
        let mut rig = Rig::new(Config::new());
        rig.encoder.fail();
        assert_eq!(
            rig.device.read_and_report(Instant::from_ticks(0), &mut NoDelay),
            Err(Error::CounterRead {
                encoder: 0,
                source: PinFault
            })
        );
    }

    #[test]
    fn test_startup_validation() {
        let config = Config::new();
        assert_eq!(config_error(DECLARATION, DESCRIPTOR, 5, config), None);

        let mut zero = config;
        zero.pulses_per_click = 0;
        assert_eq!(
            config_error(DECLARATION, DESCRIPTOR, 5, zero),
            Some(ConfigError::ZeroPulsesPerClick)
        );

        assert_eq!(
            config_error(DECLARATION, ReportDescriptor::joystick(32, 1), 4, config),
            Some(ConfigError::TooManyButtons {
                declared: 39,
                capacity: 32
            })
        );

        assert_eq!(
            config_error(DECLARATION, ReportDescriptor::joystick(200, 1), 25, config),
            Some(ConfigError::DescriptorTooLarge { buttons: 200 })
        );

        assert_eq!(
            config_error(DECLARATION, DESCRIPTOR, 8, config),
            Some(ConfigError::ReportLengthMismatch {
                descriptor: 5,
                transport: 8
            })
        );

        let mut four = config;
        four.pulses_per_click = 4;
        let mismatched = build(
            &FakeMatrix::new(6, 6),
            FakeInput::released(),
            FakeCounter::new(0),
            FakeTransport::new(5),
            DECLARATION,
            &DESCRIPTOR,
            1,
            &four,
        );
        assert_eq!(
            mismatched.err(),
            Some(ConfigError::PulsesPerClickMismatch {
                config: 4,
                encoders: 1
            })
        );

        let renamed = Declaration {
            dedicated: &["fire"],
            ..DECLARATION
        };
        assert_eq!(
            config_error(renamed, DESCRIPTOR, 5, config),
            Some(ConfigError::DeclarationMismatch)
        );
    }

    #[test]
    fn test_matrix_needs_rows_and_columns() {
        let board = FakeMatrix::new(0, 3);
        let matrix = Matrix::<FakeRow, FakeCol, 0, 3>::new(
            board.rows(),
            board.cols(),
            Duration::from_ticks(20),
            10,
        )
        .unwrap();
        let pins = DirectPins::<FakeInput, 0>::new([], [], Duration::from_ticks(20));
        let encoders = Encoders::<FakeCounter, 0>::new([], 1).unwrap();
        let declaration = Declaration {
            rows: 0,
            cols: 3,
            dedicated: &[],
            encoders: 0,
        };
        let result = ButtonBox::new(
            matrix,
            pins,
            encoders,
            FakeTransport::new(1),
            declaration,
            &ReportDescriptor::joystick(8, 1),
            &Config::new(),
        );
        assert_eq!(
            result.err(),
            Some(ConfigError::IncompleteMatrix { rows: 0, cols: 3 })
        );
    }
}
