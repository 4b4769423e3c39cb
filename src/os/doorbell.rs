//! Sensor data-ready bridge between the line interrupt and the main loop
//!
//! The interrupt handler only records that a sample is waiting; the bus
//! transaction happens later in the main loop. Edges that arrive while a
//! read is still owed collapse into that one read.

use crate::platform::LineInterrupts;
use portable_atomic::{AtomicBool, Ordering};

pub struct SensorBridge {
    pending: AtomicBool,
    line_mask: u8,
}

impl SensorBridge {
    /// Bridge that reacts to the flag bits in `line_mask`
    pub const fn new(line_mask: u8) -> Self {
        Self {
            pending: AtomicBool::new(false),
            line_mask,
        }
    }

    pub fn split(&mut self) -> (Doorbell<'_>, PendingRead<'_>) {
        let bridge: &Self = self;
        (Doorbell { bridge }, PendingRead { bridge })
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    #[inline]
    pub const fn line_mask(&self) -> u8 {
        self.line_mask
    }
}

/// Interrupt side: the only context that sets the pending flag.
pub struct Doorbell<'a> {
    bridge: &'a SensorBridge,
}

impl<'a> Doorbell<'a> {
    /// Line interrupt entry point.
    ///
    /// Rings when one of the sensor lines fired and clears exactly those
    /// flag bits. Returns whether the sensor was the source.
    pub fn on_line_interrupt<L: LineInterrupts + ?Sized>(&mut self, lines: &L) -> bool {
        let fired = lines.pending() & self.bridge.line_mask;
        if fired == 0 {
            return false;
        }

        self.bridge.pending.store(true, Ordering::Release);
        lines.acknowledge(fired);
        true
    }
}

/// Main-loop side: the only context that clears the pending flag.
pub struct PendingRead<'a> {
    bridge: &'a SensorBridge,
}

impl<'a> PendingRead<'a> {
    /// Claim the owed read, returning to idle.
    ///
    /// Call this before starting the bus transaction so that an edge during
    /// the transaction leaves the bridge pending again.
    #[inline]
    pub fn take(&mut self) -> bool {
        self.bridge.pending.swap(false, Ordering::AcqRel)
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.bridge.is_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    const LINES: u8 = 0b0011_0000;

    /// Flag register where writing a 1 clears the bit
    #[derive(Default)]
    struct FlagRegister {
        flags: Cell<u8>,
        acknowledged: Cell<u8>,
    }

    impl FlagRegister {
        fn raise(&self, bits: u8) {
            self.flags.set(self.flags.get() | bits);
        }
    }

    impl LineInterrupts for FlagRegister {
        fn pending(&self) -> u8 {
            self.flags.get()
        }

        fn acknowledge(&self, mask: u8) {
            self.acknowledged.set(self.acknowledged.get() | mask);
            self.flags.set(self.flags.get() & !mask);
        }
    }

    #[test]
    fn two_edges_before_service_yield_one_read() {
        let mut bridge = SensorBridge::new(LINES);
        let (mut bell, mut pending) = bridge.split();
        let reg = FlagRegister::default();

        reg.raise(0b0010_0000);
        assert!(bell.on_line_interrupt(&reg));
        reg.raise(0b0010_0000);
        assert!(bell.on_line_interrupt(&reg));

        assert!(pending.take());
        assert!(!pending.take());
    }

    #[test]
    fn acknowledges_only_fired_sensor_lines() {
        let mut bridge = SensorBridge::new(LINES);
        let (mut bell, pending) = bridge.split();
        let reg = FlagRegister::default();

        reg.raise(0b1001_0001);
        assert!(bell.on_line_interrupt(&reg));
        assert_eq!(reg.acknowledged.get(), 0b0001_0000);
        assert_eq!(reg.flags.get(), 0b1000_0001);
        assert!(pending.is_pending());
    }

    #[test]
    fn foreign_lines_do_not_ring() {
        let mut bridge = SensorBridge::new(LINES);
        let (mut bell, pending) = bridge.split();
        let reg = FlagRegister::default();

        reg.raise(0b0000_0110);
        assert!(!bell.on_line_interrupt(&reg));
        assert_eq!(reg.acknowledged.get(), 0);
        assert_eq!(reg.flags.get(), 0b0000_0110);
        assert!(!pending.is_pending());
    }

    #[test]
    fn edge_during_service_rearms() {
        let mut bridge = SensorBridge::new(LINES);
        let (mut bell, mut pending) = bridge.split();
        let reg = FlagRegister::default();

        reg.raise(0b0010_0000);
        bell.on_line_interrupt(&reg);
        assert!(pending.take());

        // bus transaction in progress, next sample becomes ready
        reg.raise(0b0010_0000);
        bell.on_line_interrupt(&reg);

        assert!(pending.take());
        assert!(!bridge.is_pending());
    }
}
