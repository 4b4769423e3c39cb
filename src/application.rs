//! Application layer: startup sequence and the cooperative main loop
//!
//! The loop sleeps until any interrupt, echoes everything the receive
//! interrupt queued, then services at most one owed sensor read. Receive
//! data always goes first; that order is fixed, not a fairness guarantee.

use crate::config;
use crate::diagnostics::{Diagnostics, Fault, OverrunCounter};
use crate::drivers::mma8451q::{self, AccelerometerSample, Mma8451q, Settings};
use crate::drivers::SerialConsole;
use crate::os::{Clock, Foreground, PendingRead};
use crate::platform::{Activity, StatusIndicator, TransmitKick, Wait};
use embedded_hal::blocking::i2c::{Write, WriteRead};

/// Main application state and logic
pub struct Application<'a, I2C, K, W, S, const RX: usize, const TX: usize> {
    console: SerialConsole<'a, K, RX, TX>,
    sensor: Mma8451q<I2C>,
    clock: Clock<'a>,
    pending: PendingRead<'a>,
    rx_overruns: &'a OverrunCounter,
    wait: W,
    status: S,
    diagnostics: Diagnostics,
}

impl<'a, I2C, E, K, W, S, const RX: usize, const TX: usize> Application<'a, I2C, K, W, S, RX, TX>
where
    I2C: WriteRead<Error = E> + Write<Error = E>,
    K: TransmitKick,
    W: Wait,
    S: StatusIndicator,
{
    /// Create new application instance from the main-loop handles
    pub fn new(
        foreground: Foreground<'a, RX, TX>,
        kick: K,
        sensor: Mma8451q<I2C>,
        wait: W,
        status: S,
    ) -> Self {
        let Foreground {
            clock,
            rx,
            tx,
            sensor: pending,
            rx_overruns,
        } = foreground;

        Self {
            console: SerialConsole::new(tx, rx, kick),
            sensor,
            clock,
            pending,
            rx_overruns,
            wait,
            status,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Announce ourselves and bring up the sensor.
    ///
    /// The identification string is the first thing on the wire no matter
    /// how the sensor responds. Interrupts must already be enabled: the boot
    /// delay runs on the tick counter.
    pub fn startup(&mut self, settings: &Settings) {
        self.console.send_zstring(config::IDENTIFICATION);

        self.clock.delay_ms(config::SENSOR_BOOT_MS, &mut self.wait);

        match self.sensor.probe() {
            Ok(()) => {}
            Err(mma8451q::Error::UnexpectedDevice(id)) => {
                self.diagnostics.report(Fault::UnexpectedDevice(id))
            }
            Err(mma8451q::Error::Bus(_)) => self.diagnostics.report(Fault::SensorConfig),
        }
        if self.sensor.configure(settings).is_err() {
            self.diagnostics.report(Fault::SensorConfig);
        }

        self.console.send_zstring(config::LINE_END);
    }

    /// One pass of the main loop
    pub fn poll(&mut self) {
        self.status.show(Activity::Idle);
        self.wait.wait_for_interrupt();

        self.echo_input();
        self.service_sensor();
    }

    pub fn run(&mut self) -> ! {
        loop {
            self.poll();
        }
    }

    /// Echo until the receive FIFO is empty
    fn echo_input(&mut self) {
        if !self.console.has_input() {
            return;
        }

        self.status.show(Activity::Echo);
        while let Some(byte) = self.console.read_byte() {
            self.console.send_byte(byte);
        }
    }

    fn service_sensor(&mut self) {
        // Claim before reading so an edge during the transfer re-arms
        if !self.pending.take() {
            return;
        }

        match self.sensor.read_sample() {
            Ok(sample) if sample.is_valid() => {
                emit_sample(&mut self.console, &sample);
                self.diagnostics.sample_sent();
            }
            Ok(_) => self.diagnostics.report(Fault::InvalidSample),
            Err(_) => self.diagnostics.report(Fault::BusRead),
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Bytes the receive interrupt had to drop so far
    pub fn rx_overruns(&self) -> u32 {
        self.rx_overruns.count()
    }

    pub fn clock(&self) -> Clock<'a> {
        self.clock
    }

    /// Tear down, returning the sensor, waiter and indicator
    pub fn release(self) -> (Mma8451q<I2C>, W, S) {
        (self.sensor, self.wait, self.status)
    }
}

/// `<x>,<y>,<z>\r\n`
pub fn emit_sample<K: TransmitKick, const RX: usize, const TX: usize>(
    console: &mut SerialConsole<'_, K, RX, TX>,
    sample: &AccelerometerSample,
) {
    console.send_signed_int_as_string(i32::from(sample.x));
    console.send_byte_uncommitted(b',');
    console.send_signed_int_as_string(i32::from(sample.y));
    console.send_byte_uncommitted(b',');
    console.send_signed_int_as_string(i32::from(sample.z));
    console.send_zstring(config::LINE_END);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::os::{Context, Interrupts};
    use crate::platform::{LineInterrupts, NoIndicator};
    use core::cell::Cell;
    use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction};
    use embedded_hal_mock::MockError;
    use std::io::ErrorKind;

    const ADDR: u8 = config::MMA8451Q_ADDR;

    struct NoKick;

    impl TransmitKick for NoKick {
        fn start_transmit(&mut self) {}
    }

    struct Lines(Cell<u8>);

    impl LineInterrupts for Lines {
        fn pending(&self) -> u8 {
            self.0.get()
        }

        fn acknowledge(&self, mask: u8) {
            self.0.set(self.0.get() & !mask);
        }
    }

    /// Plays the interrupt handlers: every wake is one timer tick plus
    /// whatever the test queued, and the transmitter is drained eagerly.
    struct Board<'a> {
        isr: Interrupts<'a, 8, 64>,
        lines: Lines,
        wire: Vec<u8>,
        edges: u32,
    }

    impl Wait for Board<'_> {
        fn wait_for_interrupt(&mut self) {
            self.isr.timer.tick();
            while self.edges > 0 {
                self.lines.0.set(self.lines.0.get() | 1 << config::SENSOR_INT2_LINE);
                self.isr.sensor.on_line_interrupt(&self.lines);
                self.edges -= 1;
            }
            while let Some(byte) = self.isr.serial.on_transmit_ready() {
                self.wire.push(byte);
            }
        }
    }

    fn sample_read(x: i16, y: i16, z: i16, status: u8) -> Transaction {
        let mut raw = vec![status];
        for axis in [x, y, z] {
            raw.extend_from_slice(&(axis << 2).to_be_bytes());
        }
        Transaction::write_read(ADDR, vec![0x00], raw)
    }

    fn rmw(reg: u8, before: u8, after: u8) -> [Transaction; 2] {
        [
            Transaction::write_read(ADDR, vec![reg], vec![before]),
            Transaction::write(ADDR, vec![reg, after]),
        ]
    }

    #[test]
    fn valid_sample_line_format() {
        let mut ctx = Context::<8, 64>::new(config::SENSOR_LINE_MASK);
        let (isr, fg) = ctx.split();
        let board = Board { isr, lines: Lines(Cell::new(0)), wire: Vec::new(), edges: 1 };
        let bus = I2cMock::new(&[sample_read(-1234, 0, 5678, 0x0F)]);
        let mut app = Application::new(fg, NoKick, Mma8451q::new(bus, ADDR), board, NoIndicator);

        app.poll();

        assert_eq!(app.diagnostics().samples_sent(), 1);
        let (sensor, mut board, _) = app.release();
        sensor.release().done();
        board.wait_for_interrupt();
        assert_eq!(board.wire, b"-1234,0,5678\r\n");
    }

    #[test]
    fn invalid_sample_is_skipped() {
        let mut ctx = Context::<8, 64>::new(config::SENSOR_LINE_MASK);
        let (isr, fg) = ctx.split();
        let board = Board { isr, lines: Lines(Cell::new(0)), wire: Vec::new(), edges: 1 };
        let bus = I2cMock::new(&[sample_read(1, 2, 3, 0x00)]);
        let mut app = Application::new(fg, NoKick, Mma8451q::new(bus, ADDR), board, NoIndicator);

        app.poll();

        assert_eq!(app.diagnostics().invalid_samples(), 1);
        assert_eq!(app.diagnostics().last_fault(), Some(Fault::InvalidSample));
        let (sensor, mut board, _) = app.release();
        sensor.release().done();
        board.wait_for_interrupt();
        assert!(board.wire.is_empty());
    }

    #[test]
    fn bus_failure_is_counted_not_emitted() {
        let mut ctx = Context::<8, 64>::new(config::SENSOR_LINE_MASK);
        let (isr, fg) = ctx.split();
        let board = Board { isr, lines: Lines(Cell::new(0)), wire: Vec::new(), edges: 1 };
        let bus = I2cMock::new(&[Transaction::write_read(ADDR, vec![0x00], vec![0; 7])
            .with_error(MockError::Io(ErrorKind::Other))]);
        let mut app = Application::new(fg, NoKick, Mma8451q::new(bus, ADDR), board, NoIndicator);

        app.poll();

        assert_eq!(app.diagnostics().bus_errors(), 1);
        assert_eq!(app.diagnostics().samples_sent(), 0);
        let (sensor, mut board, _) = app.release();
        sensor.release().done();
        board.wait_for_interrupt();
        assert!(board.wire.is_empty());
    }

    #[test]
    fn coalesced_edges_are_serviced_once() {
        let mut ctx = Context::<8, 64>::new(config::SENSOR_LINE_MASK);
        let (isr, fg) = ctx.split();
        let board = Board { isr, lines: Lines(Cell::new(0)), wire: Vec::new(), edges: 2 };
        // a second bus read would fail the mock
        let bus = I2cMock::new(&[sample_read(10, 20, 30, 0x0F)]);
        let mut app = Application::new(fg, NoKick, Mma8451q::new(bus, ADDR), board, NoIndicator);

        app.poll();
        app.poll();

        assert_eq!(app.diagnostics().samples_sent(), 1);
        let (sensor, board, _) = app.release();
        sensor.release().done();
        assert_eq!(board.wire, b"10,20,30\r\n");
    }

    #[test]
    fn unexpected_device_is_recorded_at_startup() {
        let mut ctx = Context::<8, 64>::new(config::SENSOR_LINE_MASK);
        let (isr, fg) = ctx.split();
        let board = Board { isr, lines: Lines(Cell::new(0)), wire: Vec::new(), edges: 0 };
        let mut expectations = vec![Transaction::write_read(ADDR, vec![0x0D], vec![0x2A])];
        expectations.extend(rmw(0x2A, 0x00, 0x00));
        expectations.extend(rmw(0x0E, 0x00, 0x00));
        expectations.extend(rmw(0x2A, 0x00, 0x3C));
        expectations.extend(rmw(0x2B, 0x00, 0x02));
        expectations.push(Transaction::write(ADDR, vec![0x2D, 0x00]));
        expectations.push(Transaction::write(ADDR, vec![0x2E, 0x00]));
        expectations.extend(rmw(0x2C, 0x00, 0x01));
        expectations.extend(rmw(0x2D, 0x00, 0x01));
        expectations.extend(rmw(0x2E, 0x00, 0x00));
        expectations.extend(rmw(0x2A, 0x3C, 0x3D));
        let bus = I2cMock::new(&expectations);
        let mut app = Application::new(fg, NoKick, Mma8451q::new(bus, ADDR), board, NoIndicator);

        app.startup(&Settings::default());

        assert_eq!(app.diagnostics().last_fault(), Some(Fault::UnexpectedDevice(0x2A)));
        assert_eq!(app.diagnostics().config_errors(), 1);
        assert!(app.clock().now() >= config::SENSOR_BOOT_MS);
        let (sensor, mut board, _) = app.release();
        sensor.release().done();
        board.wait_for_interrupt();
        assert_eq!(board.wire, b"MMA8451Q\r\n");
    }
}
