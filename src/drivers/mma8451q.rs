//! MMA8451Q 3-axis accelerometer driver
//!
//! Talks to the sensor through the blocking `embedded-hal` I2C traits; the
//! rest of the firmware only ever asks it for one sample at a time.

use embedded_hal::blocking::i2c::{Write, WriteRead};

// MMA8451Q registers
const REG_STATUS: u8 = 0x00;
const REG_WHO_AM_I: u8 = 0x0D;
const REG_XYZ_DATA_CFG: u8 = 0x0E;
const REG_CTRL_REG1: u8 = 0x2A;
const REG_CTRL_REG2: u8 = 0x2B;
const REG_CTRL_REG3: u8 = 0x2C;
const REG_CTRL_REG4: u8 = 0x2D;
const REG_CTRL_REG5: u8 = 0x2E;

/// Value of `WHO_AM_I` on a genuine MMA8451Q
pub const DEVICE_ID: u8 = 0x1A;

const CTRL1_ACTIVE: u8 = 1 << 0;
const CTRL1_LNOISE: u8 = 1 << 2;
const CTRL1_DR_MASK: u8 = 0b111 << 3;
const CTRL2_MODS_MASK: u8 = 0b11;
const CTRL3_PP_OD: u8 = 1 << 0;
const CTRL3_IPOL: u8 = 1 << 1;
const XYZ_FS_MASK: u8 = 0b11;
const XYZ_HPF_OUT: u8 = 1 << 4;

/// Full-scale range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Sensitivity {
    G2 = 0, // ±2g
    G4 = 1, // ±4g
    G8 = 2, // ±8g
}

/// Output data rate in active mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataRate {
    Hz800 = 0,
    Hz400 = 1,
    Hz200 = 2,
    Hz100 = 3,
    Hz50 = 4,
    Hz12p5 = 5,
    Hz6p25 = 6,
    Hz1p56 = 7,
}

/// Oversampling scheme (`MODS` in CTRL_REG2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Oversampling {
    Normal = 0,
    LowNoiseLowPower = 1,
    HighResolution = 2,
    LowPower = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    PushPull,
    OpenDrain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    ActiveLow,
    ActiveHigh,
}

/// Interrupt sources, as their CTRL_REG4/CTRL_REG5 bit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Interrupt {
    DataReady = 1 << 0,
    FreefallMotion = 1 << 2,
    Pulse = 1 << 3,
    Orientation = 1 << 4,
    Transient = 1 << 5,
    Fifo = 1 << 6,
    AutoSleep = 1 << 7,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptPin {
    Int1,
    Int2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The bus transaction failed
    Bus(E),
    /// `WHO_AM_I` returned something other than [`DEVICE_ID`]
    UnexpectedDevice(u8),
}

impl<E> From<E> for Error<E> {
    fn from(err: E) -> Self {
        Error::Bus(err)
    }
}

/// One reading, in raw 14-bit counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AccelerometerSample {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    /// STATUS register captured with the sample
    pub status: u8,
}

impl AccelerometerSample {
    /// Decode STATUS followed by the six left-justified output registers.
    pub fn from_registers(raw: &[u8; 7]) -> Self {
        Self {
            status: raw[0],
            x: i16::from_be_bytes([raw[1], raw[2]]) >> 2,
            y: i16::from_be_bytes([raw[3], raw[4]]) >> 2,
            z: i16::from_be_bytes([raw[5], raw[6]]) >> 2,
        }
    }

    /// A zero status means no axis had fresh data.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.status != 0
    }
}

/// Setup applied by [`Mma8451q::configure`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub sensitivity: Sensitivity,
    pub high_pass_output: bool,
    pub data_rate: DataRate,
    pub low_noise: bool,
    pub oversampling: Oversampling,
    pub pin_mode: PinMode,
    pub polarity: Polarity,
    pub data_ready_pin: InterruptPin,
}

impl Default for Settings {
    /// Slow, quiet streaming with data-ready on an open-drain, active-low INT2
    fn default() -> Self {
        Self {
            sensitivity: Sensitivity::G2,
            high_pass_output: false,
            data_rate: DataRate::Hz1p56,
            low_noise: true,
            oversampling: Oversampling::HighResolution,
            pin_mode: PinMode::OpenDrain,
            polarity: Polarity::ActiveLow,
            data_ready_pin: InterruptPin::Int2,
        }
    }
}

/// Configuration registers read back from the sensor
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegisterSnapshot {
    pub xyz_data_cfg: u8,
    pub ctrl: [u8; 5],
}

impl RegisterSnapshot {
    pub fn is_active(&self) -> bool {
        self.ctrl[0] & CTRL1_ACTIVE != 0
    }

    pub fn data_ready_enabled(&self) -> bool {
        self.ctrl[3] & Interrupt::DataReady as u8 != 0
    }
}

/// MMA8451Q driver
pub struct Mma8451q<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C, E> Mma8451q<I2C>
where
    I2C: WriteRead<Error = E> + Write<Error = E>,
{
    /// Wrap the bus. No traffic happens until a method is called.
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Give the bus back
    pub fn release(self) -> I2C {
        self.i2c
    }

    pub fn who_am_i(&mut self) -> Result<u8, Error<E>> {
        self.read_reg(REG_WHO_AM_I)
    }

    /// Check that an MMA8451Q answers at the configured address
    pub fn probe(&mut self) -> Result<(), Error<E>> {
        match self.who_am_i()? {
            DEVICE_ID => Ok(()),
            other => Err(Error::UnexpectedDevice(other)),
        }
    }

    /// Apply `settings`. Leaves the sensor in active mode.
    pub fn configure(&mut self, settings: &Settings) -> Result<(), Error<E>> {
        // Rate and range can only change in standby
        self.enter_passive_mode()?;
        self.set_sensitivity(settings.sensitivity, settings.high_pass_output)?;
        self.set_data_rate(settings.data_rate, settings.low_noise)?;
        self.set_oversampling(settings.oversampling)?;
        self.clear_interrupt_configuration()?;
        self.set_interrupt_mode(settings.pin_mode, settings.polarity)?;
        self.configure_interrupt(Interrupt::DataReady, settings.data_ready_pin)?;
        self.enter_active_mode()
    }

    pub fn enter_passive_mode(&mut self) -> Result<(), Error<E>> {
        self.modify_reg(REG_CTRL_REG1, |r| r & !CTRL1_ACTIVE)
    }

    pub fn enter_active_mode(&mut self) -> Result<(), Error<E>> {
        self.modify_reg(REG_CTRL_REG1, |r| r | CTRL1_ACTIVE)
    }

    pub fn set_sensitivity(&mut self, range: Sensitivity, high_pass_output: bool) -> Result<(), Error<E>> {
        let hpf = if high_pass_output { XYZ_HPF_OUT } else { 0 };
        self.modify_reg(REG_XYZ_DATA_CFG, |r| {
            (r & !(XYZ_FS_MASK | XYZ_HPF_OUT)) | range as u8 | hpf
        })
    }

    pub fn set_data_rate(&mut self, rate: DataRate, low_noise: bool) -> Result<(), Error<E>> {
        let lnoise = if low_noise { CTRL1_LNOISE } else { 0 };
        self.modify_reg(REG_CTRL_REG1, |r| {
            (r & !(CTRL1_DR_MASK | CTRL1_LNOISE)) | ((rate as u8) << 3) | lnoise
        })
    }

    pub fn set_oversampling(&mut self, mode: Oversampling) -> Result<(), Error<E>> {
        self.modify_reg(REG_CTRL_REG2, |r| (r & !CTRL2_MODS_MASK) | mode as u8)
    }

    /// Disable every interrupt source and route them all to INT2
    pub fn clear_interrupt_configuration(&mut self) -> Result<(), Error<E>> {
        self.write_reg(REG_CTRL_REG4, 0)?;
        self.write_reg(REG_CTRL_REG5, 0)
    }

    pub fn set_interrupt_mode(&mut self, mode: PinMode, polarity: Polarity) -> Result<(), Error<E>> {
        let od = match mode {
            PinMode::OpenDrain => CTRL3_PP_OD,
            PinMode::PushPull => 0,
        };
        let ipol = match polarity {
            Polarity::ActiveHigh => CTRL3_IPOL,
            Polarity::ActiveLow => 0,
        };
        self.modify_reg(REG_CTRL_REG3, |r| (r & !(CTRL3_PP_OD | CTRL3_IPOL)) | od | ipol)
    }

    /// Enable `source` and route it to `pin`
    pub fn configure_interrupt(&mut self, source: Interrupt, pin: InterruptPin) -> Result<(), Error<E>> {
        let bit = source as u8;
        self.modify_reg(REG_CTRL_REG4, |r| r | bit)?;
        self.modify_reg(REG_CTRL_REG5, |r| match pin {
            InterruptPin::Int1 => r | bit,
            InterruptPin::Int2 => r & !bit,
        })
    }

    pub fn fetch_configuration(&mut self) -> Result<RegisterSnapshot, Error<E>> {
        let mut snapshot = RegisterSnapshot {
            xyz_data_cfg: self.read_reg(REG_XYZ_DATA_CFG)?,
            ..Default::default()
        };
        self.read_regs(REG_CTRL_REG1, &mut snapshot.ctrl)?;
        Ok(snapshot)
    }

    /// Read STATUS and all three axes in one burst.
    pub fn read_sample(&mut self) -> Result<AccelerometerSample, Error<E>> {
        let mut raw = [0u8; 7];
        self.read_regs(REG_STATUS, &mut raw)?;
        Ok(AccelerometerSample::from_registers(&raw))
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, Error<E>> {
        let mut value = [0u8; 1];
        self.read_regs(reg, &mut value)?;
        Ok(value[0])
    }

    /// Read `buffer.len()` consecutive registers starting at `reg`
    fn read_regs(&mut self, reg: u8, buffer: &mut [u8]) -> Result<(), Error<E>> {
        self.i2c.write_read(self.address, &[reg], buffer)?;
        Ok(())
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), Error<E>> {
        self.i2c.write(self.address, &[reg, value])?;
        Ok(())
    }

    fn modify_reg<F: FnOnce(u8) -> u8>(&mut self, reg: u8, f: F) -> Result<(), Error<E>> {
        let value = self.read_reg(reg)?;
        self.write_reg(reg, f(value))
    }
}
