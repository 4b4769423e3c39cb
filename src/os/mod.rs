//! State shared between interrupt handlers and the main loop
//!
//! All of it lives in one [`Context`]. [`Context::split`] hands the
//! interrupt-side handles to the ISRs and the main-loop handles to the
//! application; each shared field ends up with exactly one writer.

pub mod doorbell;
pub mod ring_buffer;
pub mod ticks;

pub use doorbell::{Doorbell, PendingRead, SensorBridge};
pub use ring_buffer::{Consumer, Producer, RingBuffer};
pub use ticks::{elapsed, Clock, TickCounter, TickSource};

use crate::config;
use crate::diagnostics::OverrunCounter;

/// Context sized for the firmware build
pub type FirmwareContext =
    Context<{ config::UART_RX_BUFFER_SIZE }, { config::UART_TX_BUFFER_SIZE }>;

pub struct Context<const RX: usize, const TX: usize> {
    ticks: TickCounter,
    rx: RingBuffer<RX>,
    tx: RingBuffer<TX>,
    sensor: SensorBridge,
    rx_overruns: OverrunCounter,
}

impl<const RX: usize, const TX: usize> Context<RX, TX> {
    /// Fresh context whose sensor bridge watches `sensor_lines`
    pub const fn new(sensor_lines: u8) -> Self {
        Self {
            ticks: TickCounter::new(),
            rx: RingBuffer::new(),
            tx: RingBuffer::new(),
            sensor: SensorBridge::new(sensor_lines),
            rx_overruns: OverrunCounter::new(),
        }
    }

    /// Reset both FIFOs. Only possible before `split`.
    pub fn reset_buffers(&mut self) {
        self.rx.reset();
        self.tx.reset();
    }

    pub fn split(&mut self) -> (Interrupts<'_, RX, TX>, Foreground<'_, RX, TX>) {
        let (timer, clock) = self.ticks.split();
        let (rx_in, rx_out) = self.rx.split();
        let (tx_in, tx_out) = self.tx.split();
        let (doorbell, pending) = self.sensor.split();
        let overruns = &self.rx_overruns;

        (
            Interrupts {
                timer,
                serial: SerialIsr {
                    rx: rx_in,
                    tx: tx_out,
                    overruns,
                },
                sensor: doorbell,
            },
            Foreground {
                clock,
                rx: rx_out,
                tx: tx_in,
                sensor: pending,
                rx_overruns: overruns,
            },
        )
    }
}

impl Default for FirmwareContext {
    fn default() -> Self {
        Self::new(config::SENSOR_LINE_MASK)
    }
}

/// Handles owned by interrupt handlers. Every method is O(1) and never waits.
pub struct Interrupts<'a, const RX: usize, const TX: usize> {
    pub timer: TickSource<'a>,
    pub serial: SerialIsr<'a, RX, TX>,
    pub sensor: Doorbell<'a>,
}

/// Serial interrupt entry points.
pub struct SerialIsr<'a, const RX: usize, const TX: usize> {
    rx: Producer<'a, RX>,
    tx: Consumer<'a, TX>,
    overruns: &'a OverrunCounter,
}

impl<'a, const RX: usize, const TX: usize> SerialIsr<'a, RX, TX> {
    /// A byte arrived. Dropped and counted when the receive FIFO is full.
    #[inline]
    pub fn on_receive_ready(&mut self, byte: u8) {
        if !self.rx.push(byte) {
            self.overruns.record();
        }
    }

    /// The data register is free. `None` means the transmitter may go idle.
    #[inline]
    pub fn on_transmit_ready(&mut self) -> Option<u8> {
        self.tx.pop()
    }
}

/// Handles owned by the main loop.
pub struct Foreground<'a, const RX: usize, const TX: usize> {
    pub clock: Clock<'a>,
    pub rx: Consumer<'a, RX>,
    pub tx: Producer<'a, TX>,
    pub sensor: PendingRead<'a>,
    pub rx_overruns: &'a OverrunCounter,
}
