//! Device drivers
//!
//! Drivers are written against the platform abstraction traits so the same
//! code runs on the target and against mocks on the host.
//!
//! ## Modules
//!
//! - `gps`: GPS protocol detection, drivers and instance lifecycle

pub mod gps;
