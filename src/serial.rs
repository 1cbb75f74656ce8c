//! HSU serial transport for desktop using serialport crate

use crate::transport::Pn532Transport;
use embedded_hal::digital::{ErrorKind, ErrorType, InputPin};
use std::io::ErrorKind as IoErrorKind;
use std::time::Duration;

pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    // long preamble wakes the PN532 from power-down in HSU mode
    const WAKEUP: [u8; 16] = [
        0x55, 0x55, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00,
    ];

    pub fn new(port_name: &str, baud_rate: u32) -> Result<Self, serialport::Error> {
        let mut port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_secs(1))
            .open()?;
        std::thread::sleep(Duration::from_millis(500));
        std::io::Write::write_all(&mut port, &Self::WAKEUP)?;
        std::thread::sleep(Duration::from_millis(10));
        port.clear(serialport::ClearBuffer::Input)?;

        Ok(Self { port })
    }

    /// Stand-in for the IRQ line, which is not wired on USB-serial boards.
    /// Reads low while the reader has bytes waiting.
    pub fn ready_pin(&self) -> Result<SerialReadyPin, serialport::Error> {
        Ok(SerialReadyPin {
            port: self.port.try_clone()?,
        })
    }
}

impl Pn532Transport for SerialTransport {
    type Error = std::io::Error;

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        std::io::Write::write_all(&mut self.port, data)?;
        Ok(data.len())
    }

    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error> {
        self.port
            .set_timeout(Duration::from_millis(timeout_ms as u64))
            .map_err(std::io::Error::other)?;
        match std::io::Read::read(&mut self.port, buf) {
            Err(e) if e.kind() == IoErrorKind::TimedOut => Ok(0),
            other => other,
        }
    }

    fn clear_input(&mut self) -> Result<(), Self::Error> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(std::io::Error::other)
    }
}

/// Data-ready line derived from the serial input queue
pub struct SerialReadyPin {
    port: Box<dyn serialport::SerialPort>,
}

impl ErrorType for SerialReadyPin {
    type Error = ErrorKind;
}

impl InputPin for SerialReadyPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.port
            .bytes_to_read()
            .map(|pending| pending == 0)
            .map_err(|_| ErrorKind::Other)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}
