//! Hardware-in-the-loop fix injection
//!
//! A simulator can push a fix straight into instance 0. Doing so disables the
//! instance's selector and drops any real driver, so live detection never
//! competes with the injected data. Live detection only comes back through
//! [`GpsManager::set_params`].

use core::f32::consts::PI;

use nalgebra::Vector3;

use super::backend::gps_week_from_epoch_ms;
use super::manager::GpsManager;
use super::state::{GpsStatus, Location};
use crate::core::parameters::GpsType;
use crate::core::traits::TimeSource;
use crate::platform::traits::UartInterface;

const RAD_TO_DEG: f32 = 180.0 / PI;

impl<U: UartInterface, T: TimeSource> GpsManager<U, T> {
    /// Overwrite instance 0 with a simulated fix
    ///
    /// `time_epoch_ms` is milliseconds since the GPS epoch. Ground speed and
    /// course are derived from the horizontal part of `velocity` (NED, m/s).
    pub fn set_hil(
        &mut self,
        status: GpsStatus,
        time_epoch_ms: u64,
        location: Location,
        velocity: Vector3<f32>,
        num_sats: u8,
    ) {
        let now_ms = self.time.now_ms();
        let instance = &mut self.instances[0];

        let state = &mut instance.state;
        state.status = status;
        state.location = location;
        state.velocity = velocity;
        state.ground_speed = libm::hypotf(velocity.x, velocity.y);
        state.ground_course_cd =
            (libm::roundf(libm::atan2f(velocity.y, velocity.x) * RAD_TO_DEG * 100.0) as i32).rem_euclid(36_000);
        state.hdop = 0;
        state.num_sats = num_sats;
        state.have_vertical_velocity = false;
        state.last_gps_time_ms = now_ms;

        let (week, week_ms) = gps_week_from_epoch_ms(time_epoch_ms);
        state.time_week = week;
        state.time_week_ms = week_ms;

        instance.timing.last_message_time_ms = now_ms;
        instance.timing.last_fix_time_ms = now_ms;

        if self.params.gps_type[0] != GpsType::None {
            crate::log_info!("GPS 0: HIL fix injected, live detection disabled");
        }
        self.params.gps_type[0] = GpsType::None;
        instance.release();
    }
}
