//! ADC121C021 12-bit I2C analog-to-digital converter.
//!
//! Carries the 4-20mA loop current measurement. The result register holds
//! a 12-bit conversion in the low bits of a big-endian halfword.

use embedded_hal_async::i2c::I2c;
use loopbridge_core::traits::{RawAdc, SensorSource};

/// Factory-default slave address.
pub const ADC121_ADDR: u8 = 0x51;

const REG_RESULT: u8 = 0x00;
const REG_CONFIG: u8 = 0x02;
/// Automatic conversion mode.
const CONFIG_AUTO: u8 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adc121Error<E> {
    Bus(E),
}

pub struct Adc121<I2C> {
    i2c: I2C,
    addr: u8,
}

impl<I2C: I2c> Adc121<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self::with_addr(i2c, ADC121_ADDR)
    }

    pub fn with_addr(i2c: I2C, addr: u8) -> Self {
        Self { i2c, addr }
    }

    /// Put the converter into automatic conversion mode.
    pub async fn init(&mut self) -> Result<(), Adc121Error<I2C::Error>> {
        self.i2c
            .write(self.addr, &[REG_CONFIG, CONFIG_AUTO])
            .await
            .map_err(Adc121Error::Bus)
    }

    /// Read one 12-bit conversion.
    pub async fn read(&mut self) -> Result<u16, Adc121Error<I2C::Error>> {
        let mut raw = [0u8; 2];
        self.i2c
            .write_read(self.addr, &[REG_RESULT], &mut raw)
            .await
            .map_err(Adc121Error::Bus)?;
        Ok(u16::from(raw[0] & 0x0F) << 8 | u16::from(raw[1]))
    }
}

impl<I2C: I2c> RawAdc for Adc121<I2C> {
    type Error = Adc121Error<I2C::Error>;

    async fn read_raw(&mut self) -> Result<u16, Self::Error> {
        self.read().await
    }
}

impl<I2C: I2c> SensorSource for Adc121<I2C> {
    type Error = Adc121Error<I2C::Error>;

    async fn init(&mut self) -> Result<(), Self::Error> {
        Adc121::init(self).await
    }

    /// One oversampled reading, raw converter counts.
    async fn sample(&mut self) -> Result<f64, Self::Error> {
        let raw = loopbridge_core::sampling::oversampled_read(self).await?;
        Ok(raw as f64)
    }
}
