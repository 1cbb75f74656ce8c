/// Trait for PN532 communication backends.
/// Implement this trait for different transports (I2C, HSU serial, etc.)
///
/// `read` returns only frame bytes; link-level framing such as the I2C
/// ready-status byte is stripped by the implementation.
pub trait Pn532Transport {
    /// Error type for transport operations
    type Error: std::fmt::Debug;

    /// Write a complete frame to the reader
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Read data from the transport with a timeout in milliseconds.
    /// Returns 0 when nothing became available before the timeout.
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error>;

    /// Clear the input buffer
    fn clear_input(&mut self) -> Result<(), Self::Error>;
}
