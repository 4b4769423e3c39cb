//! Accelerometer-to-serial streaming firmware core
//!
//! Interrupt handlers and the cooperative main loop share a tick counter, two
//! lock-free UART FIFOs and a sensor data-ready doorbell, all held in
//! [`os::Context`]. The board binary wires real interrupts to the handles
//! from [`os::Context::split`]; tests drive the same handles from threads or
//! mock waiters.

#![cfg_attr(not(test), no_std)]

pub mod application;
pub mod config;
pub mod diagnostics;
pub mod drivers;
pub mod os;
pub mod platform;

pub use application::Application;
pub use os::{Context, FirmwareContext, Foreground, Interrupts};
