//! MediaTek v1.4 custom binary protocol
//!
//! Frame layout: `B5 62 01 05 payload[26] ck_a ck_b`. It borrows the UBX sync
//! bytes but has a fixed class/id and no length field; the Fletcher checksum
//! covers class, id and payload.
//!
//! Payload (little-endian):
//!
//! | Offset | Field        | Unit      |
//! |--------|--------------|-----------|
//! | 0      | latitude     | 1e-6 deg  |
//! | 4      | longitude    | 1e-6 deg  |
//! | 8      | altitude     | cm        |
//! | 12     | ground speed | cm/s      |
//! | 16     | course       | 1e-6 deg  |
//! | 20     | satellites   |           |
//! | 21     | fix type     | 1/2/3     |
//! | 22     | UTC time     | ms of day |

use super::{drain_port, le_i32, Detector, Fletcher8, GpsBackend};
use crate::devices::gps::state::{GpsState, GpsStatus};
use crate::platform::traits::UartInterface;

const PREAMBLE1: u8 = 0xB5;
const PREAMBLE2: u8 = 0x62;
const MSG_CLASS: u8 = 0x01;
const MSG_ID: u8 = 0x05;

pub const PAYLOAD_LEN: usize = 26;

const FIX_2D: u8 = 2;
const FIX_3D: u8 = 3;

/// Frame recogniser for MTK v1.4, also used by the driver to collect payloads
#[derive(Debug, Clone, Copy)]
pub struct MtkDetect {
    step: u8,
    ck: Fletcher8,
    counter: usize,
    payload: [u8; PAYLOAD_LEN],
}

impl Default for MtkDetect {
    fn default() -> Self {
        Self {
            step: 0,
            ck: Fletcher8::default(),
            counter: 0,
            payload: [0; PAYLOAD_LEN],
        }
    }
}

impl MtkDetect {
    /// Payload of the last complete frame
    pub fn payload(&self) -> &[u8; PAYLOAD_LEN] {
        &self.payload
    }

    fn restart(&mut self, data: u8) -> bool {
        self.step = 0;
        self.feed(data)
    }
}

impl Detector for MtkDetect {
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
                if data != MSG_CLASS {
                    return self.restart(data);
                }
                self.ck = Fletcher8::default();
                self.ck.update(data);
                self.step = 3;
            }
            3 => {
                if data != MSG_ID {
                    return self.restart(data);
                }
                self.ck.update(data);
                self.counter = 0;
                self.step = 4;
            }
            4 => {
                self.ck.update(data);
                self.payload[self.counter] = data;
                self.counter += 1;
                if self.counter == PAYLOAD_LEN {
                    self.step = 5;
                }
            }
            5 => {
                if data != self.ck.a {
                    return self.restart(data);
                }
                self.step = 6;
            }
            _ => {
                self.step = 0;
                return data == self.ck.b || self.feed(data);
            }
        }
        false
    }
}

/// MTK v1.4 driver
#[derive(Debug, Default)]
pub struct MtkDriver {
    frame: MtkDetect,
}

impl MtkDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply(payload: &[u8; PAYLOAD_LEN], state: &mut GpsState, now_ms: u64) {
        state.location.lat = le_i32(payload, 0).saturating_mul(10);
        state.location.lng = le_i32(payload, 4).saturating_mul(10);
        state.location.alt = le_i32(payload, 8);
        state.ground_speed = le_i32(payload, 12) as f32 * 0.01;
        state.ground_course_cd = (le_i32(payload, 16) / 10_000).rem_euclid(36_000);
        state.num_sats = payload[20];
        state.status = match payload[21] {
            FIX_3D => GpsStatus::Fix3D,
            FIX_2D => GpsStatus::Fix2D,
            _ => GpsStatus::NoFix,
        };
        state.velocity_from_ground_course();
        state.last_gps_time_ms = now_ms;
    }
}

impl GpsBackend for MtkDriver {
    fn read<U: UartInterface>(&mut self, port: &mut U, state: &mut GpsState, now_ms: u64) -> bool {
        let mut parsed = false;
        drain_port(port, |byte| {
            if self.frame.feed(byte) {
                Self::apply(self.frame.payload(), state, now_ms);
                parsed = true;
            }
        });
        parsed
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::platform::mock::MockUart;
    use crate::platform::traits::UartConfig;

    pub(crate) fn frame(payload: &[u8; PAYLOAD_LEN]) -> Vec<u8> {
        let mut out = vec![PREAMBLE1, PREAMBLE2, MSG_CLASS, MSG_ID];
        out.extend_from_slice(payload);
        let ck = Fletcher8::of(&out[2..]);
        out.extend_from_slice(&[ck.a, ck.b]);
        out
    }

    pub(crate) fn payload(lat: i32, lng: i32, fix: u8) -> [u8; PAYLOAD_LEN] {
        let mut p = [0u8; PAYLOAD_LEN];
        p[0..4].copy_from_slice(&lat.to_le_bytes());
        p[4..8].copy_from_slice(&lng.to_le_bytes());
        p[8..12].copy_from_slice(&12_000i32.to_le_bytes());
        p[12..16].copy_from_slice(&250i32.to_le_bytes());
        p[16..20].copy_from_slice(&90_000_000i32.to_le_bytes());
        p[20] = 7;
        p[21] = fix;
        p
    }

    #[test]
    fn test_detect_fires_on_last_byte() {
        let bytes = frame(&payload(1, 2, 3));
        let mut detect = MtkDetect::default();
        let (last, body) = bytes.split_last().unwrap();

        assert!(body.iter().all(|&b| !detect.feed(b)));
        assert!(detect.feed(*last));
    }

    #[test]
    fn test_detect_rejects_other_ubx_class() {
        let mut bytes = frame(&payload(1, 2, 3));
        bytes[3] = 0x06;

        let mut detect = MtkDetect::default();
        assert!(bytes.iter().all(|&b| !detect.feed(b)));
    }

    #[test]
    fn test_detect_resyncs_after_bad_checksum() {
        let good = frame(&payload(5, 6, 2));
        let mut bad = good.clone();
        let last = bad.len() - 1;
        bad[last] ^= 0x55;

        let mut detect = MtkDetect::default();
        assert!(bad.iter().all(|&b| !detect.feed(b)));
        assert_eq!(good.iter().filter(|&&b| detect.feed(b)).count(), 1);
    }

    #[test]
    fn test_driver_decodes_payload() {
        let mut uart = MockUart::new(UartConfig::gps());
        let mut driver = MtkDriver::new();
        let mut state = GpsState::new(0);

        uart.inject_rx_data(&frame(&payload(47_397_742, 8_545_594, 3)));
        assert!(driver.read(&mut uart, &mut state, 42));

        assert_eq!(state.status, GpsStatus::Fix3D);
        assert_eq!(state.location.lat, 473_977_420);
        assert_eq!(state.location.lng, 85_455_940);
        assert_eq!(state.location.alt, 12_000);
        assert_eq!(state.num_sats, 7);
        assert_eq!(state.ground_course_cd, 9000);
        assert!((state.ground_speed - 2.5).abs() < 1e-4);
        assert!((state.velocity.y - 2.5).abs() < 1e-3);
        assert_eq!(state.last_gps_time_ms, 42);
    }

    #[test]
    fn test_driver_no_fix() {
        let mut uart = MockUart::new(UartConfig::gps());
        let mut driver = MtkDriver::new();
        let mut state = GpsState::new(0);

        uart.inject_rx_data(&frame(&payload(0, 0, 1)));
        assert!(driver.read(&mut uart, &mut state, 0));
        assert_eq!(state.status, GpsStatus::NoFix);
    }

    #[test]
    fn test_driver_partial_frame_is_not_a_message() {
        let mut uart = MockUart::new(UartConfig::gps());
        let mut driver = MtkDriver::new();
        let mut state = GpsState::new(0);
        let bytes = frame(&payload(1, 1, 3));

        uart.inject_rx_data(&bytes[..10]);
        assert!(!driver.read(&mut uart, &mut state, 0));
        uart.inject_rx_data(&bytes[10..]);
        assert!(driver.read(&mut uart, &mut state, 0));
    }
}
