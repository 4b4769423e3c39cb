use avr_device::atmega128a::{PORTB, PORTE};
use core::marker::PhantomData;
use mma8451q_stream::platform::{Activity, StatusIndicator};

pub trait PinMode {}
pub struct Input;
pub struct Output;
impl PinMode for Input {}
impl PinMode for Output {}

#[derive(Debug)]
pub struct Pin<PORT, const PIN: u8, MODE> {
    _port: PhantomData<PORT>,
    _mode: PhantomData<MODE>,
}

impl<PORT, const P: u8, MODE> Pin<PORT, P, MODE> {
    const fn new() -> Self {
        Pin {
            _port: PhantomData,
            _mode: PhantomData,
        }
    }
}

macro_rules! impl_port {
    ($PORT:ident, $port:ident, $ddr:ident, $pin:ident) => {
        impl<const P: u8, MODE: PinMode> Pin<$PORT, P, MODE> {
            pub fn into_output(self) -> Pin<$PORT, P, Output> {
                unsafe {
                    (*$PORT::ptr()).$ddr.modify(|r, w| w.bits(r.bits() | (1 << P)));
                }
                Pin::new()
            }

            pub fn into_pull_up_input(self) -> Pin<$PORT, P, Input> {
                unsafe {
                    (*$PORT::ptr()).$ddr.modify(|r, w| w.bits(r.bits() & !(1 << P)));
                    (*$PORT::ptr()).$port.modify(|r, w| w.bits(r.bits() | (1 << P)));
                }
                Pin::new()
            }
        }

        impl<const P: u8> Pin<$PORT, P, Output> {
            #[inline]
            pub fn set_high(&mut self) {
                unsafe {
                    (*$PORT::ptr()).$port.modify(|r, w| w.bits(r.bits() | (1 << P)));
                }
            }

            #[inline]
            pub fn set_low(&mut self) {
                unsafe {
                    (*$PORT::ptr()).$port.modify(|r, w| w.bits(r.bits() & !(1 << P)));
                }
            }

            #[inline]
            pub fn set(&mut self, high: bool) {
                if high {
                    self.set_high()
                } else {
                    self.set_low()
                }
            }
        }

        impl<const P: u8> Pin<$PORT, P, Input> {
            #[inline]
            pub fn is_high(&self) -> bool {
                unsafe { (*$PORT::ptr()).$pin.read().bits() & (1 << P) != 0 }
            }
        }
    };
}

impl_port!(PORTB, portb, ddrb, pinb);
impl_port!(PORTE, porte, ddre, pine);

/// Pins this board uses, claimed by consuming the port peripherals
pub struct Pins {
    pub pb5: Pin<PORTB, 5, Input>,
    pub pb6: Pin<PORTB, 6, Input>,
    pub pb7: Pin<PORTB, 7, Input>,
    pub pe4: Pin<PORTE, 4, Input>,
    pub pe5: Pin<PORTE, 5, Input>,
}

impl Pins {
    pub fn new(_portb: PORTB, _porte: PORTE) -> Self {
        Self {
            pb5: Pin::new(),
            pb6: Pin::new(),
            pb7: Pin::new(),
            pe4: Pin::new(),
            pe5: Pin::new(),
        }
    }
}

/// RGB status LED on PB5..PB7, wired active-low
pub struct StatusLeds {
    red: Pin<PORTB, 5, Output>,
    green: Pin<PORTB, 6, Output>,
    blue: Pin<PORTB, 7, Output>,
}

impl StatusLeds {
    pub fn new(red: Pin<PORTB, 5, Input>, green: Pin<PORTB, 6, Input>, blue: Pin<PORTB, 7, Input>) -> Self {
        let mut leds = Self {
            red: red.into_output(),
            green: green.into_output(),
            blue: blue.into_output(),
        };
        leds.set(false, false, false);
        leds
    }

    fn set(&mut self, red: bool, green: bool, blue: bool) {
        self.red.set(!red);
        self.green.set(!green);
        self.blue.set(!blue);
    }
}

impl StatusIndicator for StatusLeds {
    fn show(&mut self, activity: Activity) {
        match activity {
            Activity::Idle => self.set(false, true, false),
            Activity::Echo => self.set(true, false, false),
        }
    }
}
