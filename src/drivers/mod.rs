pub mod mma8451q;
pub mod serial_console;

pub use mma8451q::{AccelerometerSample, Mma8451q, Settings};
pub use serial_console::SerialConsole;
