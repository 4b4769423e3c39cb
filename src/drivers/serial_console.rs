use crate::os::{Consumer, Producer};
use crate::platform::TransmitKick;
use core::convert::Infallible;
use ufmt::{uDisplay, uWrite, Formatter};

/// Byte stream over the UART FIFOs.
///
/// Sends go into the transmit FIFO and are drained by the data-register-empty
/// interrupt; reads come out of the receive FIFO. Only the main loop may own
/// a console, since sending blocks while the transmit FIFO is full.
pub struct SerialConsole<'a, K, const RX: usize, const TX: usize> {
    tx: Producer<'a, TX>,
    rx: Consumer<'a, RX>,
    kick: K,
}

impl<'a, K: TransmitKick, const RX: usize, const TX: usize> SerialConsole<'a, K, RX, TX> {
    pub fn new(tx: Producer<'a, TX>, rx: Consumer<'a, RX>, kick: K) -> Self {
        Self { tx, rx, kick }
    }

    /// Queue a byte and make sure the transmitter is running.
    pub fn send_byte(&mut self, byte: u8) {
        self.enqueue(byte);
        self.kick.start_transmit();
    }

    /// Queue a byte as part of a longer sequence. The transmitter is started
    /// by the next [`send_byte`](Self::send_byte) or [`commit`](Self::commit).
    pub fn send_byte_uncommitted(&mut self, byte: u8) {
        self.enqueue(byte);
    }

    /// Start draining whatever is queued
    #[inline]
    pub fn commit(&mut self) {
        self.kick.start_transmit();
    }

    /// Send bytes up to, not including, the first NUL (or the whole slice).
    pub fn send_zstring(&mut self, s: &[u8]) {
        for &byte in s.iter().take_while(|&&b| b != 0) {
            self.enqueue(byte);
        }
        self.commit();
    }

    /// Decimal text: leading `-` for negatives, no leading zeros, `0` for zero.
    pub fn send_signed_int_as_string(&mut self, value: i32) {
        uDisplay::fmt(&value, &mut Formatter::new(self)).unwrap_or_else(|e| match e {});
        self.commit();
    }

    /// Whether the receive FIFO holds a byte
    #[inline]
    pub fn has_input(&self) -> bool {
        !self.rx.is_empty()
    }

    /// Oldest received byte.
    ///
    /// The main loop is the only reader, so a byte seen by
    /// [`has_input`](Self::has_input) is still there when this runs.
    #[inline]
    pub fn read_byte(&mut self) -> Option<u8> {
        self.rx.pop()
    }

    /// Queued but not yet transmitted bytes
    #[inline]
    pub fn pending_output(&self) -> usize {
        self.tx.len()
    }

    fn enqueue(&mut self, byte: u8) {
        if self.tx.push(byte) {
            return;
        }

        // Full: space only frees up while the drain interrupt is running
        self.kick.start_transmit();
        let tx = &mut self.tx;
        nb::block!(tx.try_push(byte)).unwrap_or_else(|e| match e {});
    }
}

impl<'a, K: TransmitKick, const RX: usize, const TX: usize> uWrite for SerialConsole<'a, K, RX, TX> {
    type Error = Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Infallible> {
        for byte in s.bytes() {
            self.enqueue(byte);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::os::Context;
    use std::thread;

    #[derive(Default)]
    struct KickCounter(usize);

    impl TransmitKick for KickCounter {
        fn start_transmit(&mut self) {
            self.0 += 1;
        }
    }

    /// Run `f` against a fresh console and collect what reaches the wire
    fn sent<const RX: usize, const TX: usize>(
        ctx: &mut Context<RX, TX>,
        f: impl FnOnce(&mut SerialConsole<'_, KickCounter, RX, TX>),
    ) -> Vec<u8> {
        let (mut isr, fg) = ctx.split();
        let mut console = SerialConsole::new(fg.tx, fg.rx, KickCounter::default());
        f(&mut console);
        core::iter::from_fn(|| isr.serial.on_transmit_ready()).collect()
    }

    #[test]
    fn signed_integers_as_decimal_text() {
        let cases: [(i32, &[u8]); 6] = [
            (0, b"0"),
            (7, b"7"),
            (1000, b"1000"),
            (-1234, b"-1234"),
            (5678, b"5678"),
            (i32::MIN, b"-2147483648"),
        ];
        for (value, text) in cases {
            let mut ctx = Context::<8, 16>::new(0);
            let out = sent(&mut ctx, |c| c.send_signed_int_as_string(value));
            assert_eq!(out, text);
        }
    }

    #[test]
    fn zstring_stops_at_terminator() {
        let mut ctx = Context::<8, 16>::new(0);
        let out = sent(&mut ctx, |c| c.send_zstring(b"\r\n\0junk"));
        assert_eq!(out, b"\r\n");

        let mut ctx = Context::<8, 16>::new(0);
        let out = sent(&mut ctx, |c| c.send_zstring(b"MMA8451Q"));
        assert_eq!(out, b"MMA8451Q");
    }

    #[test]
    fn committed_sends_kick_and_uncommitted_do_not() {
        let mut ctx = Context::<8, 16>::new(0);
        let (_isr, fg) = ctx.split();
        let mut console = SerialConsole::new(fg.tx, fg.rx, KickCounter::default());

        console.send_byte_uncommitted(b'a');
        console.send_byte_uncommitted(b',');
        assert_eq!(console.kick.0, 0);
        assert_eq!(console.pending_output(), 2);

        console.send_byte(b'b');
        assert_eq!(console.kick.0, 1);
        assert_eq!(console.pending_output(), 3);
    }

    #[test]
    fn reads_received_bytes_in_order() {
        let mut ctx = Context::<8, 8>::new(0);
        let (mut isr, fg) = ctx.split();
        let mut console = SerialConsole::new(fg.tx, fg.rx, KickCounter::default());

        assert!(!console.has_input());
        isr.serial.on_receive_ready(b'h');
        isr.serial.on_receive_ready(b'i');
        assert!(console.has_input());
        assert_eq!(console.read_byte(), Some(b'h'));
        assert_eq!(console.read_byte(), Some(b'i'));
        assert_eq!(console.read_byte(), None);
    }

    #[test]
    fn blocks_on_full_fifo_until_drained() {
        const TEXT: &[u8] = b"0123456789abcdef";
        let mut ctx = Context::<4, 4>::new(0);
        let (isr, fg) = ctx.split();
        let mut console = SerialConsole::new(fg.tx, fg.rx, KickCounter::default());

        let out = thread::scope(|s| {
            let mut serial = isr.serial;
            let drain = s.spawn(move || {
                let mut out = Vec::new();
                while out.len() < TEXT.len() {
                    if let Some(byte) = serial.on_transmit_ready() {
                        out.push(byte);
                    }
                }
                out
            });
            console.send_zstring(TEXT);
            drain.join().unwrap()
        });

        assert_eq!(out, TEXT);
        assert!(console.kick.0 >= 1);
    }
}
