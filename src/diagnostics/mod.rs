//! Fault bookkeeping
//!
//! Nothing here is ever written to the serial stream, which carries only the
//! echo and sample lines. Faults are counted for inspection over a debugger
//! and, with the `defmt` feature, logged as they happen.

use portable_atomic::{AtomicU32, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    /// Bus transaction for a sample failed
    BusRead,
    /// Sensor sample read back with an empty status register
    InvalidSample,
    /// Bus transaction during sensor configuration failed
    SensorConfig,
    /// `WHO_AM_I` answered with an unexpected id
    UnexpectedDevice(u8),
}

/// Main-loop fault record.
#[derive(Debug, Default)]
pub struct Diagnostics {
    last_fault: Option<Fault>,
    bus_errors: u32,
    invalid_samples: u32,
    config_errors: u32,
    samples_sent: u32,
}

impl Diagnostics {
    pub const fn new() -> Self {
        Self {
            last_fault: None,
            bus_errors: 0,
            invalid_samples: 0,
            config_errors: 0,
            samples_sent: 0,
        }
    }

    pub fn report(&mut self, fault: Fault) {
        self.last_fault = Some(fault);
        match fault {
            Fault::BusRead => self.bus_errors = self.bus_errors.wrapping_add(1),
            Fault::InvalidSample => self.invalid_samples = self.invalid_samples.wrapping_add(1),
            Fault::SensorConfig | Fault::UnexpectedDevice(_) => {
                self.config_errors = self.config_errors.wrapping_add(1)
            }
        }

        #[cfg(feature = "defmt")]
        defmt::warn!("fault: {}", fault);
    }

    pub fn sample_sent(&mut self) {
        self.samples_sent = self.samples_sent.wrapping_add(1);
    }

    pub fn last_fault(&self) -> Option<Fault> {
        self.last_fault
    }

    pub fn bus_errors(&self) -> u32 {
        self.bus_errors
    }

    pub fn invalid_samples(&self) -> u32 {
        self.invalid_samples
    }

    pub fn config_errors(&self) -> u32 {
        self.config_errors
    }

    pub fn samples_sent(&self) -> u32 {
        self.samples_sent
    }
}

/// Bytes dropped because the receive FIFO was full.
///
/// Incremented only by the receive interrupt.
pub struct OverrunCounter {
    dropped: AtomicU32,
}

impl OverrunCounter {
    pub const fn new() -> Self {
        Self {
            dropped: AtomicU32::new(0),
        }
    }

    /// Count one dropped byte. Interrupt context only.
    #[inline]
    pub(crate) fn record(&self) {
        let dropped = self.dropped.load(Ordering::Relaxed);
        self.dropped.store(dropped.wrapping_add(1), Ordering::Release);
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.dropped.load(Ordering::Acquire)
    }
}

impl Default for OverrunCounter {
    fn default() -> Self {
        Self::new()
    }
}
