//! Platform abstraction traits
//!
//! This module defines the traits that platform implementations must provide.

pub mod uart;

pub use uart::{UartConfig, UartInterface};
