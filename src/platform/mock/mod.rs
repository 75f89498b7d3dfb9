//! Mock platform implementation for testing
//!
//! This module provides mock implementations of platform traits that can be used
//! for unit testing without requiring actual hardware.
//!
//! # Feature Gate
//!
//! This module is available in two contexts:
//! - During test builds (`#[cfg(test)]`)
//! - When the `mock` feature is enabled

#![cfg(any(test, feature = "mock"))]

mod uart;

pub use uart::MockUart;
