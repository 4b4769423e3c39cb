use avr_device::atmega128a::TC0;
use mma8451q_stream::config::TICK_COMPARE;

// TCCR0
const WGM01: u8 = 1 << 3;
const PRESCALER_MASK: u8 = 0x07;
// TIMSK
const OCIE0: u8 = 1 << 1;

/// Timer0 clock select. Timer0 on the ATmega128 has its own prescaler
/// ladder, different from Timer1/2/3.
#[derive(Clone, Copy)]
pub enum Prescaler {
    Stop = 0,
    Direct = 1,
    Div8 = 2,
    Div32 = 3,
    Div64 = 4,
    Div128 = 5,
    Div256 = 6,
    Div1024 = 7,
}

/// Timer0 in CTC mode raising `TIMER0_COMP` once per millisecond.
pub struct SysTick {
    timer: TC0,
}

impl SysTick {
    pub fn new(timer: TC0) -> Self {
        unsafe {
            timer.tccr0.write(|w| w.bits(WGM01));
            timer.tcnt0.write(|w| w.bits(0));
            timer.ocr0.write(|w| w.bits(TICK_COMPARE));
        }
        Self { timer }
    }

    /// Start counting and enable the compare interrupt
    pub fn start(&mut self) {
        self.set_prescaler(Prescaler::Div64);
        unsafe {
            self.timer.timsk.modify(|r, w| w.bits(r.bits() | OCIE0));
        }
    }

    fn set_prescaler(&mut self, prescaler: Prescaler) {
        unsafe {
            self.timer.tccr0.modify(|r, w| {
                w.bits((r.bits() & !PRESCALER_MASK) | (prescaler as u8 & PRESCALER_MASK))
            });
        }
    }
}
