#![cfg_attr(target_arch = "avr", no_std)]
#![cfg_attr(target_arch = "avr", no_main)]
#![cfg_attr(target_arch = "avr", feature(abi_avr_interrupt))]

// Register maps list more modes than this board selects
#[cfg(target_arch = "avr")]
#[allow(dead_code)]
mod hal;

#[cfg(target_arch = "avr")]
mod firmware {
    use core::cell::RefCell;
    use core::ptr::addr_of_mut;

    use avr_device::atmega128a::Peripherals;
    use avr_device::interrupt::{self, Mutex};
    use panic_halt as _;

    use mma8451q_stream::config::{self, UART_RX_BUFFER_SIZE as RX, UART_TX_BUFFER_SIZE as TX};
    use mma8451q_stream::drivers::{Mma8451q, Settings};
    use mma8451q_stream::os::{Doorbell, SerialIsr, TickSource};
    use mma8451q_stream::{Application, FirmwareContext, Interrupts};

    use crate::hal::{uart, LineFlags, Pins, Power, SensorLines, StatusLeds, SysTick, Twi, Uart};

    static mut CONTEXT: FirmwareContext = FirmwareContext::new(config::SENSOR_LINE_MASK);

    // Interrupt-side handles, installed once before interrupts are enabled
    static TIMER: Mutex<RefCell<Option<TickSource<'static>>>> = Mutex::new(RefCell::new(None));
    static SERIAL: Mutex<RefCell<Option<SerialIsr<'static, RX, TX>>>> =
        Mutex::new(RefCell::new(None));
    static SENSOR: Mutex<RefCell<Option<Doorbell<'static>>>> = Mutex::new(RefCell::new(None));

    #[avr_device::entry]
    fn main() -> ! {
        let dp = Peripherals::take().unwrap();

        // Only reference ever taken; main never returns
        let context = unsafe { &mut *addr_of_mut!(CONTEXT) };
        context.reset_buffers();
        let (isr, foreground) = context.split();
        let Interrupts {
            timer,
            serial,
            sensor,
        } = isr;

        interrupt::free(|cs| {
            TIMER.borrow(cs).replace(Some(timer));
            SERIAL.borrow(cs).replace(Some(serial));
            SENSOR.borrow(cs).replace(Some(sensor));
        });

        let pins = Pins::new(dp.PORTB, dp.PORTE);
        let leds = StatusLeds::new(pins.pb5, pins.pb6, pins.pb7);
        let mut lines = SensorLines::new(dp.EXINT, pins.pe4, pins.pe5);

        let mut systick = SysTick::new(dp.TC0);
        let serial_port = Uart::new(dp.USART0);
        let accel = Mma8451q::new(Twi::new(dp.TWI), config::MMA8451Q_ADDR);
        let power = Power::new(dp.CPU);

        systick.start();
        lines.enable();

        // Enable interrupts globally
        unsafe { interrupt::enable() };

        let mut app = Application::new(foreground, serial_port.kicker(), accel, power, leds);
        app.startup(&Settings::default());
        app.run()
    }

    #[avr_device::interrupt(atmega128a)]
    fn TIMER0_COMP() {
        interrupt::free(|cs| {
            if let Some(timer) = TIMER.borrow(cs).borrow_mut().as_mut() {
                timer.tick();
            }
        });
    }

    #[avr_device::interrupt(atmega128a)]
    fn USART0_RX() {
        // Reading UDR0 clears the interrupt, even if the byte is then dropped
        let byte = uart::read_data();
        interrupt::free(|cs| {
            if let Some(serial) = SERIAL.borrow(cs).borrow_mut().as_mut() {
                serial.on_receive_ready(byte);
            }
        });
    }

    #[avr_device::interrupt(atmega128a)]
    fn USART0_UDRE() {
        interrupt::free(|cs| {
            let next = SERIAL
                .borrow(cs)
                .borrow_mut()
                .as_mut()
                .and_then(|serial| serial.on_transmit_ready());
            match next {
                Some(byte) => uart::write_data(byte),
                None => uart::stop_transmit(),
            }
        });
    }

    #[avr_device::interrupt(atmega128a)]
    fn INT4() {
        sensor_line(config::SENSOR_INT1_LINE);
    }

    #[avr_device::interrupt(atmega128a)]
    fn INT5() {
        sensor_line(config::SENSOR_INT2_LINE);
    }

    fn sensor_line(line: u8) {
        interrupt::free(|cs| {
            if let Some(doorbell) = SENSOR.borrow(cs).borrow_mut().as_mut() {
                doorbell.on_line_interrupt(&LineFlags::entered_from(line));
            }
        });
    }
}

#[cfg(not(target_arch = "avr"))]
fn main() {
    eprintln!("mma8451q_stream runs on the ATmega128A; build with --target avr-atmega128a");
}
