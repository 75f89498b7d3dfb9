//! Core traits for platform-agnostic GPS management.
//!
//! # Features
//!
//! - **`embassy`**: Enables `EmbassyTime`
//! - Mock implementations are always available for host testing

pub mod time;

pub use time::{MockTime, TimeSource};

#[cfg(feature = "embassy")]
pub use time::EmbassyTime;
