//! TWI (I2C) master, exposed through the blocking `embedded-hal` traits

use avr_device::atmega128a::TWI;
use embedded_hal::blocking::i2c::{Write, WriteRead};

// TWCR
const TWINT: u8 = 1 << 7;
const TWEA: u8 = 1 << 6;
const TWSTA: u8 = 1 << 5;
const TWSTO: u8 = 1 << 4;
const TWEN: u8 = 1 << 2;

const STATUS_MASK: u8 = 0xF8;

/// TWI speed modes
#[derive(Clone, Copy)]
pub enum TwiSpeed {
    Standard100k,
    Fast400k,
}

/// TWI status codes
#[derive(Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum TwiStatus {
    StartTransmitted = 0x08,
    RepStartTransmitted = 0x10,
    AddrWriteAck = 0x18,
    AddrWriteNack = 0x20,
    DataWriteAck = 0x28,
    DataWriteNack = 0x30,
    ArbitrationLost = 0x38,
    AddrReadAck = 0x40,
    AddrReadNack = 0x48,
    DataReadAck = 0x50,
    DataReadNack = 0x58,
}

/// Where a transfer went wrong, with the raw TWSR status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwiError {
    Start(u8),
    AddressNack(u8),
    DataNack(u8),
    Read(u8),
}

/// TWI peripheral driver
pub struct Twi {
    twi: TWI,
}

impl Twi {
    /// Create new TWI instance, 100kHz
    pub fn new(twi: TWI) -> Self {
        let mut this = Self { twi };
        unsafe {
            this.twi.twcr.write(|w| w.bits(TWEN));
        }
        this.set_speed(TwiSpeed::Standard100k);
        this
    }

    /// Set TWI speed
    pub fn set_speed(&mut self, speed: TwiSpeed) {
        let twbr = match speed {
            TwiSpeed::Standard100k => 72, // 100kHz @ 16MHz
            TwiSpeed::Fast400k => 12,     // 400kHz @ 16MHz
        };
        unsafe {
            self.twi.twbr.write(|w| w.bits(twbr));
            self.twi.twsr.write(|w| w.bits(0));
        }
    }

    fn command(&mut self, bits: u8) -> u8 {
        unsafe {
            self.twi.twcr.write(|w| w.bits(bits | TWINT | TWEN));
        }
        while self.twi.twcr.read().bits() & TWINT == 0 {}
        self.twi.twsr.read().bits() & STATUS_MASK
    }

    fn start(&mut self, repeated: bool) -> Result<(), TwiError> {
        let status = self.command(TWSTA);
        let expected = if repeated {
            TwiStatus::RepStartTransmitted
        } else {
            TwiStatus::StartTransmitted
        };
        if status == expected as u8 {
            Ok(())
        } else {
            Err(TwiError::Start(status))
        }
    }

    fn stop(&mut self) {
        unsafe {
            self.twi.twcr.write(|w| w.bits(TWINT | TWEN | TWSTO));
        }
        while self.twi.twcr.read().bits() & TWSTO != 0 {}
    }

    /// Write address + R/W bit
    fn write_address(&mut self, addr: u8, read: bool) -> Result<(), TwiError> {
        unsafe {
            self.twi.twdr.write(|w| w.bits((addr << 1) | read as u8));
        }
        let status = self.command(0);
        let expected = if read {
            TwiStatus::AddrReadAck
        } else {
            TwiStatus::AddrWriteAck
        };
        if status == expected as u8 {
            Ok(())
        } else {
            Err(TwiError::AddressNack(status))
        }
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), TwiError> {
        unsafe {
            self.twi.twdr.write(|w| w.bits(byte));
        }
        let status = self.command(0);
        if status == TwiStatus::DataWriteAck as u8 {
            Ok(())
        } else {
            Err(TwiError::DataNack(status))
        }
    }

    /// Read a byte and send ACK (more to come) or NACK (last byte)
    fn read_byte(&mut self, ack: bool) -> Result<u8, TwiError> {
        let (bits, expected) = if ack {
            (TWEA, TwiStatus::DataReadAck)
        } else {
            (0, TwiStatus::DataReadNack)
        };
        let status = self.command(bits);
        if status == expected as u8 {
            Ok(self.twi.twdr.read().bits())
        } else {
            Err(TwiError::Read(status))
        }
    }

    fn send(&mut self, address: u8, bytes: &[u8]) -> Result<(), TwiError> {
        self.start(false)?;
        self.write_address(address, false)?;
        for &byte in bytes {
            self.write_byte(byte)?;
        }
        Ok(())
    }

    fn send_then_receive(&mut self, address: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), TwiError> {
        self.send(address, bytes)?;
        self.start(true)?;
        self.write_address(address, true)?;

        let last = buffer.len().saturating_sub(1);
        for (i, slot) in buffer.iter_mut().enumerate() {
            *slot = self.read_byte(i < last)?;
        }
        Ok(())
    }
}

impl Write for Twi {
    type Error = TwiError;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), TwiError> {
        let result = self.send(address, bytes);
        // Release the bus on failure too
        self.stop();
        result
    }
}

impl WriteRead for Twi {
    type Error = TwiError;

    fn write_read(&mut self, address: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), TwiError> {
        let result = self.send_then_receive(address, bytes, buffer);
        self.stop();
        result
    }
}
