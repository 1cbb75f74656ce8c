//! I2C transport for ESP32 using esp-idf-hal

use crate::transport::Pn532Transport;
use esp_idf_hal::delay::{BLOCK, FreeRtos, TickType};
use esp_idf_hal::gpio::{InputPin, OutputPin};
use esp_idf_hal::i2c::{I2c, I2cConfig, I2cDriver};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::units::Hertz;
use esp_idf_svc::sys::EspError;
use std::time::{Duration, Instant};

pub struct I2cTransport<'a> {
    i2c: I2cDriver<'a>,
    address: u8,
}

impl<'a> I2cTransport<'a> {
    // first byte of every read; bit 0 set once the PN532 has data
    const STATUS_READY: u8 = 0x01;

    pub fn new(
        i2c: impl Peripheral<P = impl I2c> + 'a,
        sda: impl Peripheral<P = impl InputPin + OutputPin> + 'a,
        scl: impl Peripheral<P = impl InputPin + OutputPin> + 'a,
        address: u8,
    ) -> Result<Self, EspError> {
        let config = I2cConfig::new().baudrate(Hertz(100_000));
        let i2c = I2cDriver::new(i2c, sda, scl, &config)?;

        Ok(Self { i2c, address })
    }
}

impl Pn532Transport for I2cTransport<'_> {
    type Error = EspError;

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        self.i2c.write(self.address, data, BLOCK)?;
        Ok(data.len())
    }

    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error> {
        let timeout = Duration::from_millis(timeout_ms as u64);
        let ticks = TickType::new_millis(timeout_ms as u64).ticks();
        let start = Instant::now();
        let mut raw = vec![0u8; buf.len() + 1];

        loop {
            self.i2c.read(self.address, &mut raw, ticks)?;
            if raw[0] & Self::STATUS_READY != 0 {
                buf.copy_from_slice(&raw[1..]);
                return Ok(buf.len());
            }
            if start.elapsed() >= timeout {
                return Ok(0);
            }
            FreeRtos::delay_ms(1);
        }
    }

    fn clear_input(&mut self) -> Result<(), Self::Error> {
        // each I2C read is a fresh transaction; nothing is buffered
        Ok(())
    }
}
