//! Platform abstraction layer
//!
//! Hardware access for the GPS subsystem goes through the traits in this
//! module. Concrete HAL bindings live with the board support code; the mock
//! implementation backs host tests.

pub mod error;
pub mod traits;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export commonly used types
pub use error::{PlatformError, Result, UartError};
pub use traits::{UartConfig, UartInterface};
