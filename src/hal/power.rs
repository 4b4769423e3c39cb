use avr_device::atmega128a::CPU;
use mma8451q_stream::platform::Wait;

// MCUCR
const SE: u8 = 1 << 5;
const SM_MASK: u8 = 0b0001_1100;

#[derive(Clone, Copy)]
#[repr(u8)]
pub enum SleepMode {
    Idle = 0,
    AdcNoiseReduction = 1,
    PowerDown = 2,
    PowerSave = 3,
    Standby = 6,
    ExtendedStandby = 7,
}

impl SleepMode {
    /// SM2 is bit 2, SM1:0 are bits 4:3
    fn mcucr_bits(self) -> u8 {
        let sm = self as u8;
        ((sm & 0b011) << 3) | (sm & 0b100)
    }
}

pub struct Power {
    cpu: CPU,
}

impl Power {
    pub fn new(cpu: CPU) -> Self {
        Self { cpu }
    }

    #[inline]
    pub fn set_sleep_mode(&mut self, mode: SleepMode) {
        unsafe {
            self.cpu
                .mcucr
                .modify(|r, w| w.bits((r.bits() & !SM_MASK) | mode.mcucr_bits()));
        }
    }

    #[inline]
    pub fn enable_sleep(&mut self) {
        unsafe {
            self.cpu.mcucr.modify(|r, w| w.bits(r.bits() | SE));
        }
    }

    #[inline]
    pub fn disable_sleep(&mut self) {
        unsafe {
            self.cpu.mcucr.modify(|r, w| w.bits(r.bits() & !SE));
        }
    }

    /// Idle keeps the timers, USART and TWI clocked, so every interrupt
    /// source the firmware uses can wake it.
    pub fn enter_idle_mode(&mut self) {
        self.set_sleep_mode(SleepMode::Idle);
        self.enable_sleep();
        avr_device::asm::sleep();
        self.disable_sleep();
    }
}

impl Wait for Power {
    #[inline]
    fn wait_for_interrupt(&mut self) {
        self.enter_idle_mode();
    }
}
