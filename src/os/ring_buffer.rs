//! Lock-free single-producer/single-consumer byte FIFO
//!
//! One instance backs the UART receive path (producer: RX-complete ISR,
//! consumer: main loop) and another the transmit path (producer: main loop,
//! consumer: data-register-empty ISR). Each index has exactly one writer,
//! which is what makes the queue safe without masking interrupts. The
//! [`Producer`] and [`Consumer`] handles returned by [`RingBuffer::split`]
//! carry that rule in the type system.

use core::cell::UnsafeCell;
use portable_atomic::{AtomicU8, Ordering};

/// Fixed-capacity byte queue.
///
/// `N` must be a power of two between 2 and 128. Both indices are
/// free-running `u8` counters, so `write - read` (wrapping) is the fill level
/// and `index & (N - 1)` is the slot.
pub struct RingBuffer<const N: usize> {
    data: UnsafeCell<[u8; N]>,
    write_idx: AtomicU8,
    read_idx: AtomicU8,
}

// SAFETY: slots are only written by the single producer before it publishes
// them with a Release store of `write_idx`, and only read by the single
// consumer after an Acquire load of `write_idx`. A slot is never written
// while it is between `read_idx` and `write_idx`.
unsafe impl<const N: usize> Sync for RingBuffer<N> {}

impl<const N: usize> RingBuffer<N> {
    const CAPACITY_OK: () = assert!(
        N.is_power_of_two() && N >= 2 && N <= 128,
        "ring buffer capacity must be a power of two in 2..=128"
    );
    const MASK: u8 = (N - 1) as u8;

    /// Create an empty buffer. Usable in `static` initializers.
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_OK;
        Self {
            data: UnsafeCell::new([0; N]),
            write_idx: AtomicU8::new(0),
            read_idx: AtomicU8::new(0),
        }
    }

    /// Reset both indices to zero.
    ///
    /// Needs exclusive access, so it cannot run while either interrupt path
    /// holds a handle to this buffer.
    pub fn reset(&mut self) {
        *self.write_idx.get_mut() = 0;
        *self.read_idx.get_mut() = 0;
    }

    /// Split into the producer and consumer halves.
    pub fn split(&mut self) -> (Producer<'_, N>, Consumer<'_, N>) {
        let buffer: &Self = self;
        (Producer { buffer }, Consumer { buffer })
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of queued bytes. A snapshot; may be stale by one element.
    #[inline]
    pub fn len(&self) -> usize {
        let write = self.write_idx.load(Ordering::Acquire);
        let read = self.read_idx.load(Ordering::Acquire);
        // an observer that owns neither index can see `read` overtake a
        // stale `write`
        (write.wrapping_sub(read) as usize).min(N)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == N
    }

    #[inline]
    fn slot(&self, index: u8) -> *mut u8 {
        // SAFETY: `index & MASK` is always below N
        unsafe { self.data.get().cast::<u8>().add((index & Self::MASK) as usize) }
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Writing half. Owns the write index.
pub struct Producer<'a, const N: usize> {
    buffer: &'a RingBuffer<N>,
}

impl<'a, const N: usize> Producer<'a, N> {
    /// Append a byte. Returns `false` without touching the buffer when full.
    ///
    /// Never blocks; safe to call from an interrupt handler.
    pub fn push(&mut self, byte: u8) -> bool {
        let write = self.buffer.write_idx.load(Ordering::Relaxed);
        let read = self.buffer.read_idx.load(Ordering::Acquire);
        if write.wrapping_sub(read) as usize == N {
            return false;
        }

        // SAFETY: the slot at `write` is outside the readable window and only
        // this producer writes slots
        unsafe { self.buffer.slot(write).write(byte) };
        self.buffer
            .write_idx
            .store(write.wrapping_add(1), Ordering::Release);
        true
    }

    /// Non-blocking push in `nb` form, for callers that want to block on it
    pub fn try_push(&mut self, byte: u8) -> nb::Result<(), core::convert::Infallible> {
        if self.push(byte) {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.buffer.is_full()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }
}

/// Reading half. Owns the read index.
pub struct Consumer<'a, const N: usize> {
    buffer: &'a RingBuffer<N>,
}

impl<'a, const N: usize> Consumer<'a, N> {
    /// Remove and return the oldest byte, or `None` when empty.
    pub fn pop(&mut self) -> Option<u8> {
        let read = self.buffer.read_idx.load(Ordering::Relaxed);
        let write = self.buffer.write_idx.load(Ordering::Acquire);
        if read == write {
            return None;
        }

        // SAFETY: the slot at `read` was published by the Acquire load above
        // and the producer will not reuse it until `read_idx` moves past it
        let byte = unsafe { self.buffer.slot(read).read() };
        self.buffer
            .read_idx
            .store(read.wrapping_add(1), Ordering::Release);
        Some(byte)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.buffer.is_full()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn pops_in_push_order() {
        let mut fifo = RingBuffer::<8>::new();
        let (mut tx, mut rx) = fifo.split();

        assert!(rx.pop().is_none());
        for byte in b"abc" {
            assert!(tx.push(*byte));
        }
        assert_eq!(rx.pop(), Some(b'a'));
        assert!(tx.push(b'd'));
        assert_eq!(rx.pop(), Some(b'b'));
        assert_eq!(rx.pop(), Some(b'c'));
        assert_eq!(rx.pop(), Some(b'd'));
        assert_eq!(rx.pop(), None);
    }

    #[test]
    fn rejects_push_when_full_without_mutation() {
        let mut fifo = RingBuffer::<4>::new();
        let (mut tx, mut rx) = fifo.split();

        for byte in 1..=4u8 {
            assert!(!tx.is_full());
            assert!(tx.push(byte));
        }
        assert!(tx.is_full());
        assert!(rx.is_full());
        assert!(!tx.push(99));
        assert_eq!(tx.len(), 4);

        let drained: Vec<u8> = core::iter::from_fn(|| rx.pop()).collect();
        assert_eq!(drained, [1, 2, 3, 4]);
        assert!(rx.is_empty());
        assert!(!rx.is_full());
    }

    #[test]
    fn full_again_only_after_n_pushes_since_drain() {
        let mut fifo = RingBuffer::<4>::new();
        let (mut tx, mut rx) = fifo.split();

        tx.push(1);
        tx.push(2);
        rx.pop();
        tx.push(3);
        tx.push(4);
        tx.push(5);
        assert!(tx.is_full());
        assert!(!tx.push(6));
    }

    #[test]
    fn indices_survive_u8_wraparound() {
        let mut fifo = RingBuffer::<32>::new();
        let (mut tx, mut rx) = fifo.split();

        // 1000 bytes walk both indices around 256 several times
        let mut next_in = 0u8;
        let mut next_out = 0u8;
        for round in 0..100 {
            for _ in 0..(round % 7 + 3) {
                if tx.push(next_in) {
                    next_in = next_in.wrapping_add(1);
                }
            }
            while let Some(byte) = rx.pop() {
                assert_eq!(byte, next_out);
                next_out = next_out.wrapping_add(1);
            }
        }
        assert_eq!(next_in, next_out);
        assert!(fifo.is_empty());
    }

    #[test]
    fn reset_discards_contents() {
        let mut fifo = RingBuffer::<8>::new();
        {
            let (mut tx, _) = fifo.split();
            tx.push(1);
            tx.push(2);
        }
        assert_eq!(fifo.len(), 2);
        fifo.reset();
        assert!(fifo.is_empty());
        assert_eq!(fifo.capacity(), 8);
    }

    #[test]
    fn try_push_reports_would_block() {
        let mut fifo = RingBuffer::<2>::new();
        let (mut tx, _rx) = fifo.split();
        assert!(tx.try_push(1).is_ok());
        assert!(tx.try_push(2).is_ok());
        assert!(matches!(tx.try_push(3), Err(nb::Error::WouldBlock)));
    }

    #[test]
    fn concurrent_producer_and_consumer_preserve_order() {
        const COUNT: usize = 50_000;
        let mut fifo = RingBuffer::<16>::new();
        let (mut tx, mut rx) = fifo.split();

        thread::scope(|s| {
            s.spawn(move || {
                for i in 0..COUNT {
                    while !tx.push(i as u8) {
                        std::hint::spin_loop();
                    }
                }
            });

            let mut received = 0usize;
            while received < COUNT {
                match rx.pop() {
                    Some(byte) => {
                        assert_eq!(byte, received as u8);
                        received += 1;
                    }
                    None => std::hint::spin_loop(),
                }
            }
        });
        assert!(fifo.is_empty());
    }
}
