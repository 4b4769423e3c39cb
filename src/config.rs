//! Configuration constants for the accelerometer streaming firmware

/// CPU frequency in Hz
pub const CPU_FREQ_HZ: u32 = 16_000_000;

/// UART baud rate
pub const UART_BAUD: u32 = 9600;

/// USART0 baud register value for `UART_BAUD` at `CPU_FREQ_HZ`
pub const UART_UBRR: u16 = (CPU_FREQ_HZ / (16 * UART_BAUD) - 1) as u16;

/// Tick period of the system timer in milliseconds
pub const TICK_MS: u32 = 1;

/// Timer0 compare value for a 1ms tick with the /64 prescaler (16MHz/64 = 250kHz)
pub const TICK_COMPARE: u8 = (CPU_FREQ_HZ / 64 / 1000 * TICK_MS - 1) as u8;

/// Receive FIFO capacity (power of two)
pub const UART_RX_BUFFER_SIZE: usize = 32;

/// Transmit FIFO capacity (power of two)
pub const UART_TX_BUFFER_SIZE: usize = 32;

/// MMA8451Q 7-bit bus address (SA0 pulled high)
pub const MMA8451Q_ADDR: u8 = 0x1D;

/// Identification string sent before anything else on the serial stream
pub const IDENTIFICATION: &[u8] = b"MMA8451Q";

/// Line terminator for the identification line and every sample line
pub const LINE_END: &[u8] = b"\r\n";

/// Bit of the MMA8451Q INT1 line in the external interrupt flag register (INT4)
pub const SENSOR_INT1_LINE: u8 = 4;

/// Bit of the MMA8451Q INT2 line in the external interrupt flag register (INT5)
pub const SENSOR_INT2_LINE: u8 = 5;

/// Lines owned by the sensor bridge; no other flag bit may be touched
pub const SENSOR_LINE_MASK: u8 = (1 << SENSOR_INT1_LINE) | (1 << SENSOR_INT2_LINE);

/// Time the accelerometer needs after power-up before it accepts configuration
pub const SENSOR_BOOT_MS: u32 = 2;
