//! GPS fix state and timing records
//!
//! `GpsState` is the record the rest of the autopilot reads. It is written by
//! exactly one party per tick: the instance's driver, the HIL entry point, or
//! the lifecycle manager resetting it to `NoGps`.

use core::f32::consts::PI;
use nalgebra::Vector3;

const DEG_TO_RAD: f32 = PI / 180.0;

/// GPS fix status, ordered from worst to best
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum GpsStatus {
    /// No receiver detected on the link
    #[default]
    NoGps = 0,
    /// Receiver talking, no position fix
    NoFix = 1,
    /// 2D fix (latitude, longitude only)
    Fix2D = 2,
    /// 3D fix (latitude, longitude, altitude)
    Fix3D = 3,
}

impl GpsStatus {
    /// Convert a raw status value, saturating unknown values to `NoGps`
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => GpsStatus::NoFix,
            2 => GpsStatus::Fix2D,
            3 => GpsStatus::Fix3D,
            _ => GpsStatus::NoGps,
        }
    }
}

/// Geographic position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Location {
    /// Latitude in 1e-7 degrees
    pub lat: i32,
    /// Longitude in 1e-7 degrees
    pub lng: i32,
    /// Altitude above mean sea level in centimeters
    pub alt: i32,
}

impl Location {
    /// Build a location from degrees and meters
    pub fn from_degrees(lat_deg: f64, lng_deg: f64, alt_m: f32) -> Self {
        Self {
            lat: libm::round(lat_deg * 1.0e7) as i32,
            lng: libm::round(lng_deg * 1.0e7) as i32,
            alt: libm::roundf(alt_m * 100.0) as i32,
        }
    }

    /// Latitude in degrees
    pub fn lat_deg(&self) -> f64 {
        self.lat as f64 * 1.0e-7
    }

    /// Longitude in degrees
    pub fn lng_deg(&self) -> f64 {
        self.lng as f64 * 1.0e-7
    }
}

/// Fix state of one GPS instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsState {
    /// Instance index this record belongs to
    pub instance: u8,
    /// Fix status
    pub status: GpsStatus,
    /// Milliseconds into the GPS week
    pub time_week_ms: u32,
    /// GPS week number
    pub time_week: u16,
    /// Satellites used in the solution
    pub num_sats: u8,
    /// Horizontal dilution of precision, scaled by 100
    pub hdop: u16,
    /// Last reported position
    pub location: Location,
    /// Ground speed in m/s
    pub ground_speed: f32,
    /// Course over ground in centidegrees
    pub ground_course_cd: i32,
    /// Velocity in m/s, north/east/down
    pub velocity: Vector3<f32>,
    /// Whether `velocity.z` comes from the receiver
    pub have_vertical_velocity: bool,
    /// System time of the last fix update in milliseconds
    pub last_gps_time_ms: u64,
}

impl GpsState {
    /// Empty record for `instance`
    pub fn new(instance: u8) -> Self {
        Self {
            instance,
            status: GpsStatus::NoGps,
            time_week_ms: 0,
            time_week: 0,
            num_sats: 0,
            hdop: 0,
            location: Location::default(),
            ground_speed: 0.0,
            ground_course_cd: 0,
            velocity: Vector3::zeros(),
            have_vertical_velocity: false,
            last_gps_time_ms: 0,
        }
    }

    /// Derive horizontal velocity from `ground_speed` and `ground_course_cd`
    ///
    /// Used by protocols that report speed and course but no velocity vector.
    pub fn velocity_from_ground_course(&mut self) {
        let course_rad = self.ground_course_cd as f32 * 0.01 * DEG_TO_RAD;
        self.velocity = Vector3::new(
            self.ground_speed * libm::cosf(course_rad),
            self.ground_speed * libm::sinf(course_rad),
            0.0,
        );
        self.have_vertical_velocity = false;
    }
}

impl Default for GpsState {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Message timing of one GPS instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GpsTiming {
    /// System time of the last parsed message (or status reset)
    pub last_message_time_ms: u64,
    /// System time of the last message carrying a 2D or better fix
    pub last_fix_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ordering() {
        assert!(GpsStatus::NoGps < GpsStatus::NoFix);
        assert!(GpsStatus::NoFix < GpsStatus::Fix2D);
        assert!(GpsStatus::Fix2D < GpsStatus::Fix3D);
    }

    #[test]
    fn test_status_from_u8() {
        assert_eq!(GpsStatus::from_u8(3), GpsStatus::Fix3D);
        assert_eq!(GpsStatus::from_u8(200), GpsStatus::NoGps);
    }

    #[test]
    fn test_location_from_degrees() {
        let loc = Location::from_degrees(48.1173, 11.516_666, 545.4);
        assert_eq!(loc.lat, 481_173_000);
        assert!((loc.lng_deg() - 11.516_666).abs() < 1e-6);
        assert_eq!(loc.alt, 54_540);
    }

    #[test]
    fn test_velocity_from_ground_course() {
        let mut state = GpsState::new(1);
        state.ground_speed = 2.0;
        state.ground_course_cd = 9000;
        state.velocity_from_ground_course();

        assert!(state.velocity.x.abs() < 1e-4);
        assert!((state.velocity.y - 2.0).abs() < 1e-4);
        assert!(!state.have_vertical_velocity);
    }
}
