//! Core functionality
//!
//! Logging, time abstraction, parameters and the notify flags shared with
//! the rest of the autopilot.

pub mod logging;
pub mod notify;
pub mod parameters;
pub mod traits;
