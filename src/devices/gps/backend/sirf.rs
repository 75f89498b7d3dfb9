//! SiRF binary protocol
//!
//! Frame layout: `A0 A2 len_hi len_lo payload[len] ck_hi ck_lo B0 B3`. The
//! checksum is the 15-bit sum of the payload bytes, sent big-endian. The
//! trailer is not checked.
//!
//! Only message 41 (Geodetic Navigation Data) is decoded. All its fields are
//! big-endian; offsets below include the message id byte at 0.

use super::{be_i32, be_u16, be_u32, drain_port, Detector, GpsBackend};
use crate::devices::gps::state::{GpsState, GpsStatus};
use crate::platform::traits::UartInterface;

const PREAMBLE1: u8 = 0xA0;
const PREAMBLE2: u8 = 0xA2;

const CHECKSUM_MASK: u16 = 0x7FFF;

/// Longest frame the driver will follow; longer lengths are treated as noise
const MAX_PAYLOAD: u16 = 1023;

const MSG_GEONAV: u8 = 41;
const GEONAV_LEN: usize = 91;

const FIX_MASK: u16 = 0x07;
const FIX_3D: u16 = 0x06;

const OFS_FIX_INVALID: usize = 1;
const OFS_FIX_TYPE: usize = 3;
const OFS_WEEK: usize = 5;
const OFS_TIME: usize = 7;
const OFS_LATITUDE: usize = 23;
const OFS_LONGITUDE: usize = 27;
const OFS_ALTITUDE_MSL: usize = 35;
const OFS_GROUND_SPEED: usize = 40;
const OFS_GROUND_COURSE: usize = 42;
const OFS_SATELLITES: usize = 88;
const OFS_HDOP: usize = 89;

/// Scratch state for recognising a SiRF frame
///
/// Only frames with a zero high length byte are considered.
#[derive(Debug, Clone, Copy, Default)]
pub struct SirfDetect {
    step: u8,
    checksum: u16,
    payload_length: u16,
    payload_counter: u16,
}

impl SirfDetect {
    fn restart(&mut self, data: u8) -> bool {
        *self = Self::default();
        self.feed(data)
    }
}

impl Detector for SirfDetect {
    fn feed(&mut self, data: u8) -> bool {
        match self.step {
            0 => {
                if data == PREAMBLE1 {
                    self.step = 1;
                }
            }
            1 => {
                if data != PREAMBLE2 {
                    return self.restart(data);
                }
                self.step = 2;
            }
            2 => {
                if data != 0 {
                    return self.restart(data);
                }
                self.step = 3;
            }
            3 => {
                self.payload_length = data as u16;
                self.payload_counter = 0;
                self.checksum = 0;
                self.step = if data == 0 { 5 } else { 4 };
            }
            4 => {
                self.checksum = self.checksum.wrapping_add(data as u16) & CHECKSUM_MASK;
                self.payload_counter += 1;
                if self.payload_counter == self.payload_length {
                    self.step = 5;
                }
            }
            5 => {
                if data != (self.checksum >> 8) as u8 {
                    return self.restart(data);
                }
                self.step = 6;
            }
            _ => {
                let valid = data == (self.checksum & 0xFF) as u8;
                *self = Self::default();
                return valid || self.feed(data);
            }
        }
        false
    }
}

/// SiRF binary driver
#[derive(Debug)]
pub struct SirfDriver {
    step: u8,
    checksum: u16,
    payload_length: u16,
    payload_counter: u16,
    payload: [u8; GEONAV_LEN],
}

impl Default for SirfDriver {
    fn default() -> Self {
        Self {
            step: 0,
            checksum: 0,
            payload_length: 0,
            payload_counter: 0,
            payload: [0; GEONAV_LEN],
        }
    }
}

impl SirfDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse(&mut self, data: u8, state: &mut GpsState, now_ms: u64) -> bool {
        match self.step {
            0 => {
                if data == PREAMBLE1 {
                    self.step = 1;
                }
            }
            1 => {
                if data == PREAMBLE2 {
                    self.step = 2;
                } else {
                    self.step = 0;
                    return self.parse(data, state, now_ms);
                }
            }
            2 => {
                self.payload_length = (data as u16) << 8;
                self.step = 3;
            }
            3 => {
                self.payload_length |= data as u16;
                if self.payload_length == 0 || self.payload_length > MAX_PAYLOAD {
                    self.step = 0;
                    return false;
                }
                self.payload_counter = 0;
                self.checksum = 0;
                self.step = 4;
            }
            4 => {
                self.checksum = self.checksum.wrapping_add(data as u16) & CHECKSUM_MASK;
                let index = self.payload_counter as usize;
                if index < GEONAV_LEN {
                    self.payload[index] = data;
                }
                self.payload_counter += 1;
                if self.payload_counter == self.payload_length {
                    self.step = 5;
                }
            }
            5 => {
                self.step = if data == (self.checksum >> 8) as u8 { 6 } else { 0 };
            }
            _ => {
                self.step = 0;
                if data != (self.checksum & 0xFF) as u8 {
                    crate::log_debug!("GPS: SiRF bad checksum");
                    return false;
                }
                if self.payload[0] == MSG_GEONAV && self.payload_length as usize == GEONAV_LEN {
                    Self::apply_geonav(&self.payload, state, now_ms);
                    return true;
                }
            }
        }
        false
    }

    fn apply_geonav(p: &[u8; GEONAV_LEN], state: &mut GpsState, now_ms: u64) {
        state.status = if be_u16(p, OFS_FIX_INVALID) != 0 {
            GpsStatus::NoFix
        } else if be_u16(p, OFS_FIX_TYPE) & FIX_MASK == FIX_3D {
            GpsStatus::Fix3D
        } else {
            GpsStatus::Fix2D
        };

        state.time_week = be_u16(p, OFS_WEEK);
        state.time_week_ms = be_u32(p, OFS_TIME);
        state.location.lat = be_i32(p, OFS_LATITUDE);
        state.location.lng = be_i32(p, OFS_LONGITUDE);
        state.location.alt = be_i32(p, OFS_ALTITUDE_MSL);
        state.ground_speed = be_u16(p, OFS_GROUND_SPEED) as i16 as f32 * 0.01;
        state.ground_course_cd = (be_u16(p, OFS_GROUND_COURSE) as i16 as i32).rem_euclid(36_000);
        state.num_sats = p[OFS_SATELLITES];
        // reported in units of 0.2
        state.hdop = p[OFS_HDOP] as u16 * 20;

        state.velocity_from_ground_course();
        state.last_gps_time_ms = now_ms;
    }
}

impl GpsBackend for SirfDriver {
    fn read<U: UartInterface>(&mut self, port: &mut U, state: &mut GpsState, now_ms: u64) -> bool {
        let mut parsed = false;
        drain_port(port, |byte| parsed |= self.parse(byte, state, now_ms));
        parsed
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::platform::mock::MockUart;
    use crate::platform::traits::UartConfig;

    pub(crate) fn frame(payload: &[u8]) -> Vec<u8> {
        let len = (payload.len() as u16).to_be_bytes();
        let mut out = vec![PREAMBLE1, PREAMBLE2, len[0], len[1]];
        out.extend_from_slice(payload);
        let sum = payload.iter().fold(0u16, |acc, &b| acc.wrapping_add(b as u16)) & CHECKSUM_MASK;
        out.extend_from_slice(&sum.to_be_bytes());
        out.extend_from_slice(&[0xB0, 0xB3]);
        out
    }

    pub(crate) fn geonav(fix_invalid: u16, fix_type: u16) -> [u8; GEONAV_LEN] {
        let mut p = [0u8; GEONAV_LEN];
        p[0] = MSG_GEONAV;
        p[OFS_FIX_INVALID..OFS_FIX_INVALID + 2].copy_from_slice(&fix_invalid.to_be_bytes());
        p[OFS_FIX_TYPE..OFS_FIX_TYPE + 2].copy_from_slice(&fix_type.to_be_bytes());
        p[OFS_WEEK..OFS_WEEK + 2].copy_from_slice(&1500u16.to_be_bytes());
        p[OFS_TIME..OFS_TIME + 4].copy_from_slice(&345_600_000u32.to_be_bytes());
        p[OFS_LATITUDE..OFS_LATITUDE + 4].copy_from_slice(&(-337_000_000i32).to_be_bytes());
        p[OFS_LONGITUDE..OFS_LONGITUDE + 4].copy_from_slice(&1_512_000_000i32.to_be_bytes());
        p[OFS_ALTITUDE_MSL..OFS_ALTITUDE_MSL + 4].copy_from_slice(&2_500i32.to_be_bytes());
        p[OFS_GROUND_SPEED..OFS_GROUND_SPEED + 2].copy_from_slice(&300u16.to_be_bytes());
        p[OFS_GROUND_COURSE..OFS_GROUND_COURSE + 2].copy_from_slice(&27_000u16.to_be_bytes());
        p[OFS_SATELLITES] = 8;
        p[OFS_HDOP] = 6;
        p
    }

    #[test]
    fn test_detect_short_message() {
        let bytes = frame(&[0x02, 0x10, 0x20]);
        let mut detect = SirfDetect::default();
        let hits = bytes.iter().filter(|&&b| detect.feed(b)).count();
        assert_eq!(hits, 1);
    }

    #[test]
    fn test_detect_fires_on_checksum_low_byte() {
        let bytes = frame(&geonav(0, 6));
        let mut detect = SirfDetect::default();
        // trailer bytes B0 B3 follow the checksum
        let ck_lo = bytes.len() - 3;

        assert!(bytes[..ck_lo].iter().all(|&b| !detect.feed(b)));
        assert!(detect.feed(bytes[ck_lo]));
    }

    #[test]
    fn test_detect_ignores_long_messages() {
        let bytes = frame(&[0x55u8; 300]);
        let mut detect = SirfDetect::default();
        assert!(bytes.iter().all(|&b| !detect.feed(b)));
    }

    #[test]
    fn test_driver_geonav() {
        let mut uart = MockUart::new(UartConfig::gps());
        let mut driver = SirfDriver::new();
        let mut state = GpsState::new(0);

        uart.inject_rx_data(&frame(&geonav(0, 0x0E)));
        assert!(driver.read(&mut uart, &mut state, 5));

        assert_eq!(state.status, GpsStatus::Fix3D);
        assert_eq!(state.time_week, 1500);
        assert_eq!(state.time_week_ms, 345_600_000);
        assert_eq!(state.location.lat, -337_000_000);
        assert_eq!(state.location.lng, 1_512_000_000);
        assert_eq!(state.location.alt, 2_500);
        assert_eq!(state.num_sats, 8);
        assert_eq!(state.hdop, 120);
        assert_eq!(state.ground_course_cd, 27_000);
        assert!((state.velocity.y + 3.0).abs() < 1e-3);
    }

    #[test]
    fn test_driver_fix_status() {
        let mut uart = MockUart::new(UartConfig::gps());
        let mut driver = SirfDriver::new();
        let mut state = GpsState::new(0);

        uart.inject_rx_data(&frame(&geonav(0, 0x04)));
        assert!(driver.read(&mut uart, &mut state, 0));
        assert_eq!(state.status, GpsStatus::Fix2D);

        uart.inject_rx_data(&frame(&geonav(1, 0x06)));
        assert!(driver.read(&mut uart, &mut state, 0));
        assert_eq!(state.status, GpsStatus::NoFix);
    }

    #[test]
    fn test_driver_skips_other_messages() {
        let mut uart = MockUart::new(UartConfig::gps());
        let mut driver = SirfDriver::new();
        let mut state = GpsState::new(0);

        uart.inject_rx_data(&frame(&[0x02, 0x00, 0x01]));
        assert!(!driver.read(&mut uart, &mut state, 0));
        assert_eq!(state.status, GpsStatus::NoGps);
    }
}
