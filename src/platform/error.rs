//! Platform error types
//!
//! This module defines error types for platform operations.

use core::fmt;

/// Result type for platform operations
pub type Result<T> = core::result::Result<T, PlatformError>;

/// Platform-level errors
///
/// All platform implementations map their HAL-specific errors to these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlatformError {
    /// UART operation failed
    Uart(UartError),
    /// Invalid configuration provided
    InvalidConfig,
    /// Resource not available
    ResourceUnavailable,
}

/// UART-specific errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartError {
    /// Write operation failed
    WriteFailed,
    /// Read operation failed
    ReadFailed,
    /// Invalid baud rate
    InvalidBaudRate,
    /// Framing error
    FramingError,
    /// Overrun error
    Overrun,
}

impl From<UartError> for PlatformError {
    fn from(e: UartError) -> Self {
        PlatformError::Uart(e)
    }
}

impl fmt::Display for UartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UartError::WriteFailed => write!(f, "write failed"),
            UartError::ReadFailed => write!(f, "read failed"),
            UartError::InvalidBaudRate => write!(f, "invalid baud rate"),
            UartError::FramingError => write!(f, "framing error"),
            UartError::Overrun => write!(f, "receive overrun"),
        }
    }
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::Uart(e) => write!(f, "UART error: {}", e),
            PlatformError::InvalidConfig => write!(f, "Invalid configuration"),
            PlatformError::ResourceUnavailable => write!(f, "Resource not available"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uart_error_converts() {
        let err: PlatformError = UartError::Overrun.into();
        assert_eq!(err, PlatformError::Uart(UartError::Overrun));
    }

    #[test]
    fn test_display() {
        let err = PlatformError::Uart(UartError::WriteFailed);
        assert_eq!(format!("{}", err), "UART error: write failed");
    }
}
