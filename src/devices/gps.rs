//! GPS receivers
//!
//! Up to [`GPS_MAX_INSTANCES`] receivers are managed, each on its own UART.
//! Nothing about a receiver is configured up front beyond a protocol
//! selector: the baud rate and wire protocol are found by listening.
//!
//! # Supported protocols
//!
//! - u-blox UBX (detected at 38400 baud and above)
//! - MediaTek v1.6/v1.9 binary and v1.4 custom binary
//! - SiRF binary (feature `gps-sirf`)
//! - NMEA-0183 (after a 5 s settling period)
//!
//! # Example
//!
//! ```ignore
//! use trail_gps::core::parameters::GpsParams;
//! use trail_gps::core::traits::MockTime;
//! use trail_gps::devices::gps::{GpsManager, GpsStatus};
//! use trail_gps::platform::mock::MockUart;
//! use trail_gps::platform::traits::UartConfig;
//!
//! let time = MockTime::new();
//! let uart = MockUart::new(UartConfig::gps());
//! let mut gps = GpsManager::new(GpsParams::default(), [Some(uart), None], &time);
//!
//! gps.init();
//! gps.update();
//! assert_eq!(gps.status(0), GpsStatus::NoGps);
//! ```

pub mod backend;
pub mod blob;
pub mod detect;
pub mod hil;
pub mod manager;
pub mod state;
pub mod task;


/// Number of GPS instances managed
pub const GPS_MAX_INSTANCES: usize = 2;

pub use backend::{GpsBackend, GpsDriver, GpsProtocol};
pub use blob::{BlobStream, INIT_BLOB};
pub use detect::{DetectState, DETECT_BAUDRATES};
pub use manager::{GpsInstance, GpsManager};
pub use state::{GpsState, GpsStatus, GpsTiming, Location};
pub use task::UpdateRate;
