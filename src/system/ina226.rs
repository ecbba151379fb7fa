//! INA226 pack power monitor
//!
//! Current, bus voltage and power over async I2C. The device converts
//! continuously, so every read returns the latest averaged conversion.
//!
//! # Scaling
//! ```text
//! Bus voltage = BUS_V register * 1.25 mV
//! Calibration = 0.00512 / (current LSB * shunt resistance)
//! Current     = CURRENT register (signed) * current LSB
//! Power       = POWER register * 25 * current LSB
//! ```
//!
//! A failed read is logged and answered with the last good value.

use embedded_hal_async::i2c::I2c;
use libm::roundf;

use crate::system::sensors::PowerSensor;
use crate::Error;

/// Default 7-bit address (A0 = A1 = GND)
pub const DEFAULT_ADDRESS: u8 = 0x40;

const REG_CONFIG: u8 = 0x00;
const REG_BUS_VOLTAGE: u8 = 0x02;
const REG_POWER: u8 = 0x03;
const REG_CURRENT: u8 = 0x04;
const REG_CALIBRATION: u8 = 0x05;
const REG_MANUFACTURER_ID: u8 = 0xFE;

/// "TI" in ASCII
const MANUFACTURER_ID: u16 = 0x5449;

/// 16-sample averaging, 1.1 ms bus and shunt conversion, continuous mode
const CONFIG_CONTINUOUS_AVG16: u16 = 0x4527;

const BUS_VOLTAGE_LSB: f32 = 0.001_25;
const POWER_LSB_FACTOR: f32 = 25.0;

/// Shunt on the power board (Ohm)
const DEFAULT_SHUNT_OHMS: f32 = 0.01;
/// 1 mA per current count
const DEFAULT_CURRENT_LSB: f32 = 0.001;

#[derive(Debug, Clone, Copy, Default)]
struct Reading {
    current: f32,
    voltage: f32,
    power: f32,
}

/// INA226 on a shared async I2C bus
pub struct Ina226<I> {
    i2c: I,
    address: u8,
    current_lsb: f32,
    calibration: u16,
    last: Reading,
}

impl<I: I2c> Ina226<I> {
    /// Monitor at the default address with the board's shunt
    pub fn new(i2c: I) -> Self {
        Self::with_shunt(i2c, DEFAULT_ADDRESS, DEFAULT_SHUNT_OHMS, DEFAULT_CURRENT_LSB)
    }

    /// Monitor with an explicit address, shunt (Ohm) and current resolution (A/count)
    pub fn with_shunt(i2c: I, address: u8, shunt_ohms: f32, current_lsb: f32) -> Self {
        let calibration = roundf(0.005_12 / (current_lsb * shunt_ohms)) as u16;
        Self {
            i2c,
            address,
            current_lsb,
            calibration,
            last: Reading::default(),
        }
    }

    /// Value written to the calibration register
    pub fn calibration(&self) -> u16 {
        self.calibration
    }

    async fn read_register(&mut self, register: u8) -> Result<u16, I::Error> {
        let mut buf = [0u8; 2];
        self.i2c.write_read(self.address, &[register], &mut buf).await?;
        Ok(u16::from_be_bytes(buf))
    }

    async fn write_register(&mut self, register: u8, value: u16) -> Result<(), I::Error> {
        let [high, low] = value.to_be_bytes();
        self.i2c.write(self.address, &[register, high, low]).await
    }
}

impl<I: I2c> PowerSensor for Ina226<I> {
    async fn init(&mut self) -> Result<(), Error> {
        let id = self
            .read_register(REG_MANUFACTURER_ID)
            .await
            .map_err(|_| Error::PowerSensorUnavailable)?;
        if id != MANUFACTURER_ID {
            error!("INA226: unexpected manufacturer id {=u16:#x}", id);
            return Err(Error::PowerSensorUnavailable);
        }

        self.write_register(REG_CONFIG, CONFIG_CONTINUOUS_AVG16)
            .await
            .map_err(|_| Error::PowerSensorBus)?;
        let calibration = self.calibration;
        self.write_register(REG_CALIBRATION, calibration)
            .await
            .map_err(|_| Error::PowerSensorBus)?;

        info!("INA226 initialized, calibration {=u16}", calibration);
        Ok(())
    }

    async fn current(&mut self) -> f32 {
        match self.read_register(REG_CURRENT).await {
            Ok(raw) => self.last.current = raw as i16 as f32 * self.current_lsb,
            Err(_) => warn!("INA226: current read failed"),
        }
        self.last.current
    }

    async fn bus_voltage(&mut self) -> f32 {
        match self.read_register(REG_BUS_VOLTAGE).await {
            Ok(raw) => self.last.voltage = raw as f32 * BUS_VOLTAGE_LSB,
            Err(_) => warn!("INA226: bus voltage read failed"),
        }
        self.last.voltage
    }

    async fn power(&mut self) -> f32 {
        match self.read_register(REG_POWER).await {
            Ok(raw) => self.last.power = raw as f32 * POWER_LSB_FACTOR * self.current_lsb,
            Err(_) => warn!("INA226: power read failed"),
        }
        self.last.power
    }
}
