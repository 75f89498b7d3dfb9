//! Notify flags
//!
//! Small set of status values published by sensor subsystems for consumers
//! such as LED/buzzer drivers and telemetry. Values are plain atomics so the
//! flags can live in a `static` and be read from any context.

use core::sync::atomic::{AtomicU8, Ordering};

use crate::devices::gps::GpsStatus;

/// Published status flags
#[derive(Debug)]
pub struct NotifyFlags {
    gps_status: AtomicU8,
}

/// Global notify flags read by the rest of the autopilot
pub static NOTIFY: NotifyFlags = NotifyFlags::new();

impl NotifyFlags {
    /// Create flags with every value at its "nothing known" state
    pub const fn new() -> Self {
        Self {
            gps_status: AtomicU8::new(GpsStatus::NoGps as u8),
        }
    }

    /// Publish the primary GPS status
    pub fn set_gps_status(&self, status: GpsStatus) {
        self.gps_status.store(status as u8, Ordering::Relaxed);
    }

    /// Last published primary GPS status
    pub fn gps_status(&self) -> GpsStatus {
        GpsStatus::from_u8(self.gps_status.load(Ordering::Relaxed))
    }
}

impl Default for NotifyFlags {
    fn default() -> Self {
        Self::new()
    }
}
