use avr_device::atmega128a::USART0;
use avr_device::interrupt;
use mma8451q_stream::config::UART_UBRR;
use mma8451q_stream::platform::TransmitKick;

// UCSR0B
const RXCIE: u8 = 1 << 7;
const UDRIE: u8 = 1 << 5;
const RXEN: u8 = 1 << 4;
const TXEN: u8 = 1 << 3;
// UCSR0C: asynchronous, no parity, 1 stop bit, 8 data bits
const FRAME_8N1: u8 = 0b11 << 1;

/// USART0 configured for interrupt-driven operation.
///
/// Bytes never pass through this type; the receive and data-register-empty
/// interrupts move them between the data register and the FIFOs.
pub struct Uart {
    _usart: USART0,
}

impl Uart {
    pub fn new(usart: USART0) -> Self {
        unsafe {
            // Set baud rate
            usart.ubrr0h.write(|w| w.bits((UART_UBRR >> 8) as u8));
            usart.ubrr0l.write(|w| w.bits(UART_UBRR as u8));
            usart.ucsr0c.write(|w| w.bits(FRAME_8N1));

            // Enable TX, RX and RX interrupt; UDRE stays off until there is data
            usart.ucsr0b.write(|w| w.bits(RXEN | TXEN | RXCIE));
        }

        Self { _usart: usart }
    }

    pub fn kicker(&self) -> TxKick {
        TxKick { _private: () }
    }
}

/// Enables the data-register-empty interrupt
pub struct TxKick {
    _private: (),
}

impl TransmitKick for TxKick {
    #[inline]
    fn start_transmit(&mut self) {
        // The UDRE handler clears UDRIE in the same register
        interrupt::free(|_| unsafe {
            (*USART0::ptr())
                .ucsr0b
                .modify(|r, w| w.bits(r.bits() | UDRIE));
        });
    }
}

/// Received byte. RX-complete interrupt only.
#[inline]
pub fn read_data() -> u8 {
    unsafe { (*USART0::ptr()).udr0.read().bits() }
}

/// Load the next byte. Data-register-empty interrupt only.
#[inline]
pub fn write_data(byte: u8) {
    unsafe { (*USART0::ptr()).udr0.write(|w| w.bits(byte)) }
}

/// Nothing left to send: silence the data-register-empty interrupt.
/// Called with interrupts disabled.
#[inline]
pub fn stop_transmit() {
    unsafe {
        (*USART0::ptr())
            .ucsr0b
            .modify(|r, w| w.bits(r.bits() & !UDRIE));
    }
}
