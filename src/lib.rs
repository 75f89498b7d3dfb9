#![cfg_attr(not(test), no_std)]

//! trail_gps - GPS receiver management for the pico_trail autopilot
//!
//! Finds out which wire protocol each attached GPS receiver speaks by sniffing
//! its serial stream (cycling baud rates and priming receivers with an
//! initialisation blob), then polls the matching driver for as long as the
//! link stays healthy.

// Mock platform outside of unit tests needs std for its buffers
#[cfg(all(not(test), feature = "mock"))]
extern crate std;

// Platform abstraction layer (UART transport)
pub mod platform;

// Core systems: logging, time, parameters, notify flags
pub mod core;

// Device drivers using platform abstraction
pub mod devices;

// Note: Logging macros (log_info!, log_warn!, log_error!, log_debug!)
// are exported at crate root via #[macro_export] in core::logging
