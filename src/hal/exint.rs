use avr_device::atmega128a::{EXINT, PORTE};
use mma8451q_stream::config::SENSOR_LINE_MASK;
use mma8451q_stream::platform::LineInterrupts;

use super::gpio::{Input, Pin};

// EICRB: ISCn1:ISCn0 = 0b10 selects the falling edge for INT4..INT7
const fn falling_edge(line: u8) -> u8 {
    0b10 << ((line - 4) * 2)
}

/// INT4/INT5 on PE4/PE5, the accelerometer's open-drain interrupt outputs
pub struct SensorLines {
    exint: EXINT,
    _int1: Pin<PORTE, 4, Input>,
    _int2: Pin<PORTE, 5, Input>,
}

impl SensorLines {
    pub fn new(exint: EXINT, int1: Pin<PORTE, 4, Input>, int2: Pin<PORTE, 5, Input>) -> Self {
        Self {
            exint,
            _int1: int1.into_pull_up_input(),
            _int2: int2.into_pull_up_input(),
        }
    }

    /// Select falling edges, drop stale flags, unmask both lines
    pub fn enable(&mut self) {
        let edges = falling_edge(4) | falling_edge(5);
        unsafe {
            self.exint.eicrb.modify(|r, w| w.bits(r.bits() | edges));
            self.exint.eifr.write(|w| w.bits(SENSOR_LINE_MASK));
            self.exint.eimsk.modify(|r, w| w.bits(r.bits() | SENSOR_LINE_MASK));
        }
    }
}

/// Flag register view for one external interrupt vector.
///
/// The hardware clears a line's EIFR flag when its vector starts, so the
/// line being serviced is reported pending alongside whatever else is
/// still latched.
pub struct LineFlags {
    entered: u8,
}

impl LineFlags {
    pub const fn entered_from(line: u8) -> Self {
        Self { entered: 1 << line }
    }
}

impl LineInterrupts for LineFlags {
    fn pending(&self) -> u8 {
        unsafe { (*EXINT::ptr()).eifr.read().bits() | self.entered }
    }

    fn acknowledge(&self, mask: u8) {
        // Write-one-to-clear: a plain write touches only the bits in `mask`
        unsafe { (*EXINT::ptr()).eifr.write(|w| w.bits(mask)) }
    }
}
