//! UART interface trait
//!
//! This module defines the buffered, non-blocking UART interface that GPS
//! links are driven through.

use crate::platform::Result;

/// UART configuration
#[derive(Debug, Clone, Copy)]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baud_rate: u32,
    /// Receive buffer size in bytes
    pub rx_buffer: usize,
    /// Transmit buffer size in bytes
    pub tx_buffer: usize,
}

impl UartConfig {
    /// Configuration used for GPS links: 38400 baud, 256 byte RX, 16 byte TX
    pub const fn gps() -> Self {
        Self {
            baud_rate: 38_400,
            rx_buffer: 256,
            tx_buffer: 16,
        }
    }
}

impl Default for UartConfig {
    fn default() -> Self {
        Self::gps()
    }
}

/// Buffered UART interface
///
/// Reads and writes only touch the driver's ring buffers and never wait on
/// the wire.
///
/// # Safety Invariants
///
/// - UART peripheral must be initialized before use
/// - Only one owner per UART peripheral instance
/// - No concurrent access to the same UART from multiple contexts
pub trait UartInterface {
    /// Queue data for transmission
    ///
    /// Returns the number of bytes accepted, which may be less than
    /// `data.len()` when the transmit buffer is short on space.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Uart` if the write operation fails.
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Read buffered data
    ///
    /// Reads up to `buffer.len()` bytes into the provided buffer.
    /// Returns the number of bytes actually read (0 when nothing is pending).
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Uart` if the read operation fails.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Set UART baud rate
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Uart(UartError::InvalidBaudRate)` if the baud rate
    /// cannot be achieved with the current clock configuration.
    fn set_baud_rate(&mut self, baud: u32) -> Result<()>;

    /// Number of received bytes waiting to be read
    fn available(&self) -> usize;

    /// Free space in the transmit buffer, in bytes
    fn tx_space(&self) -> usize;

    /// Read a single byte if one is pending
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Uart` if the read operation fails.
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }
}
