//! ATmega128A peripherals behind the platform traits of the core crate

pub mod exint;
pub mod gpio;
pub mod power;
pub mod timer;
pub mod twi;
pub mod uart;

pub use exint::{LineFlags, SensorLines};
pub use gpio::{Pins, StatusLeds};
pub use power::Power;
pub use timer::SysTick;
pub use twi::Twi;
pub use uart::Uart;
