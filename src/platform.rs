//! Narrow capabilities the core needs from the board.
//!
//! Everything here is implemented by the ATmega128A binding in the firmware
//! binary and by simple mocks in the tests.

/// Low-power wait until the next interrupt, whichever source raises it.
pub trait Wait {
    fn wait_for_interrupt(&mut self);
}

/// Starts the transmit-empty interrupt so it drains the TX FIFO.
///
/// Must be cheap and idempotent; it is called for every committed byte.
pub trait TransmitKick {
    fn start_transmit(&mut self);
}

/// Pending-flag register shared by several external interrupt lines.
pub trait LineInterrupts {
    /// Snapshot of the pending flags, one bit per line
    fn pending(&self) -> u8;

    /// Clear exactly the flags set in `mask`; every other bit is left alone
    fn acknowledge(&self, mask: u8);
}

/// What the main loop is doing, for the board's status LEDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Activity {
    /// About to sleep until the next interrupt
    Idle,
    /// Draining the receive FIFO
    Echo,
}

pub trait StatusIndicator {
    fn show(&mut self, activity: Activity);
}

/// Indicator for boards without LEDs
pub struct NoIndicator;

impl StatusIndicator for NoIndicator {
    #[inline]
    fn show(&mut self, _activity: Activity) {}
}

impl<T: Wait + ?Sized> Wait for &mut T {
    #[inline]
    fn wait_for_interrupt(&mut self) {
        (**self).wait_for_interrupt()
    }
}

impl<T: TransmitKick + ?Sized> TransmitKick for &mut T {
    #[inline]
    fn start_transmit(&mut self) {
        (**self).start_transmit()
    }
}
