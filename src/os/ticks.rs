//! Millisecond system time

use crate::platform::Wait;
use portable_atomic::{AtomicU32, Ordering};

/// Free-running tick count, advanced once per timer interrupt.
///
/// Wraps after 2^32 ticks (~49.7 days at 1 kHz). Compare times only through
/// [`elapsed`], never with `<` on raw values.
pub struct TickCounter {
    count: AtomicU32,
}

impl TickCounter {
    pub const fn new() -> Self {
        Self::starting_at(0)
    }

    /// Counter preset to `ticks`, e.g. to exercise wraparound
    pub const fn starting_at(ticks: u32) -> Self {
        Self {
            count: AtomicU32::new(ticks),
        }
    }

    /// Hand out the single writer and a reader.
    pub fn split(&mut self) -> (TickSource<'_>, Clock<'_>) {
        let counter: &Self = self;
        (TickSource { counter }, Clock { counter })
    }

    #[inline]
    pub fn now(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Ticks between `start` and `now`, correct across one wraparound.
#[inline]
pub const fn elapsed(start: u32, now: u32) -> u32 {
    now.wrapping_sub(start)
}

/// Writer side, owned by the timer interrupt.
pub struct TickSource<'a> {
    counter: &'a TickCounter,
}

impl<'a> TickSource<'a> {
    /// Advance by one tick.
    #[inline]
    pub fn tick(&mut self) {
        // sole writer, so a plain load/store pair is enough
        let count = self.counter.count.load(Ordering::Relaxed);
        self.counter
            .count
            .store(count.wrapping_add(1), Ordering::Release);
    }
}

/// Reader side. Any number of copies may exist.
#[derive(Clone, Copy)]
pub struct Clock<'a> {
    counter: &'a TickCounter,
}

impl<'a> Clock<'a> {
    #[inline]
    pub fn now(&self) -> u32 {
        self.counter.now()
    }

    #[inline]
    pub fn elapsed_since(&self, start: u32) -> u32 {
        elapsed(start, self.now())
    }

    #[inline]
    pub fn has_elapsed(&self, start: u32, duration_ms: u32) -> bool {
        self.elapsed_since(start) >= duration_ms
    }

    /// Sleep for at least `duration_ms` milliseconds.
    ///
    /// Any interrupt ends a wait, not only the tick, so the deadline is
    /// re-checked after every wake.
    pub fn delay_ms<W: Wait>(&self, duration_ms: u32, wait: &mut W) {
        let start = self.now();
        while !self.has_elapsed(start, duration_ms) {
            wait.wait_for_interrupt();
        }
    }
}
