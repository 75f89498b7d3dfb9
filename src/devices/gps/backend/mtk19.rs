//! MediaTek v1.6/v1.9 binary protocol
//!
//! Frame layout: `(D0|D1) DD 20 payload[32] ck_a ck_b`. The first preamble byte
//! selects the firmware generation: `D0` is v1.6 with positions in 1e-6
//! degrees, `D1` is v1.9 with 1e-7 degrees. The Fletcher checksum covers the
//! length byte and the payload.

use super::{drain_port, gps_time_from_utc, le_i32, le_u16, le_u32, Detector, Fletcher8, GpsBackend};
use crate::devices::gps::state::{GpsState, GpsStatus};
use crate::platform::traits::UartInterface;

const PREAMBLE1_V16: u8 = 0xD0;
const PREAMBLE1_V19: u8 = 0xD1;
const PREAMBLE2: u8 = 0xDD;

pub const PAYLOAD_LEN: usize = 32;

const FIX_2D: u8 = 2;
const FIX_3D: u8 = 3;
const FIX_2D_SBAS: u8 = 6;
const FIX_3D_SBAS: u8 = 7;

/// Frame recogniser for MTK v1.6/v1.9, also used by the driver to collect payloads
#[derive(Debug, Clone, Copy)]
pub struct Mtk19Detect {
    step: u8,
    v19: bool,
    ck: Fletcher8,
    counter: usize,
    payload: [u8; PAYLOAD_LEN],
}

impl Default for Mtk19Detect {
    fn default() -> Self {
        Self {
            step: 0,
            v19: false,
            ck: Fletcher8::default(),
            counter: 0,
            payload: [0; PAYLOAD_LEN],
        }
    }
}

impl Mtk19Detect {
    /// Payload of the last complete frame
    pub fn payload(&self) -> &[u8; PAYLOAD_LEN] {
        &self.payload
    }

    /// Whether the last preamble announced v1.9 scaling
    pub fn is_v19(&self) -> bool {
        self.v19
    }

    fn restart(&mut self, data: u8) -> bool {
        self.step = 0;
        self.feed(data)
    }
}

impl Detector for Mtk19Detect {
    fn feed(&mut self, data: u8) -> bool {
        match self.step {
            0 => {
                if data == PREAMBLE1_V16 || data == PREAMBLE1_V19 {
                    self.v19 = data == PREAMBLE1_V19;
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
                if data as usize != PAYLOAD_LEN {
                    return self.restart(data);
                }
                self.ck = Fletcher8::default();
                self.ck.update(data);
                self.counter = 0;
                self.step = 3;
            }
            3 => {
                self.ck.update(data);
                self.payload[self.counter] = data;
                self.counter += 1;
                if self.counter == PAYLOAD_LEN {
                    self.step = 4;
                }
            }
            4 => {
                if data != self.ck.a {
                    return self.restart(data);
                }
                self.step = 5;
            }
            _ => {
                self.step = 0;
                return data == self.ck.b || self.feed(data);
            }
        }
        false
    }
}

/// MTK v1.6/v1.9 driver
#[derive(Debug, Default)]
pub struct Mtk19Driver {
    frame: Mtk19Detect,
}

impl Mtk19Driver {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply(payload: &[u8; PAYLOAD_LEN], v19: bool, state: &mut GpsState, now_ms: u64) {
        let scale = if v19 { 1 } else { 10 };
        state.location.lat = le_i32(payload, 0).saturating_mul(scale);
        state.location.lng = le_i32(payload, 4).saturating_mul(scale);
        state.location.alt = le_i32(payload, 8);
        state.ground_speed = le_i32(payload, 12) as f32 * 0.01;
        state.ground_course_cd = le_i32(payload, 16).rem_euclid(36_000);
        state.num_sats = payload[20];
        state.status = match payload[21] {
            FIX_3D | FIX_3D_SBAS => GpsStatus::Fix3D,
            FIX_2D | FIX_2D_SBAS => GpsStatus::Fix2D,
            _ => GpsStatus::NoFix,
        };
        state.hdop = le_u16(payload, 30);

        if let Some((week, week_ms)) = utc_to_gps(le_u32(payload, 22), le_u32(payload, 26)) {
            state.time_week = week;
            state.time_week_ms = week_ms;
        }

        state.velocity_from_ground_course();
        state.last_gps_time_ms = now_ms;
    }
}

/// Convert `DDMMYY` and `HHMMSSmmm` fields to GPS week time
fn utc_to_gps(date: u32, time: u32) -> Option<(u16, u32)> {
    if date == 0 {
        return None;
    }
    let day = date / 10_000;
    let month = (date / 100) % 100;
    let year = 2000 + (date % 100) as i32;
    if !(1..=12).contains(&month) || day == 0 {
        return None;
    }

    let hour = time / 10_000_000;
    let minute = (time / 100_000) % 100;
    gps_time_from_utc(year, month, day, hour, minute, time % 100_000)
}

impl GpsBackend for Mtk19Driver {
    fn read<U: UartInterface>(&mut self, port: &mut U, state: &mut GpsState, now_ms: u64) -> bool {
        let mut parsed = false;
        drain_port(port, |byte| {
            if self.frame.feed(byte) {
                Self::apply(self.frame.payload(), self.frame.is_v19(), state, now_ms);
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

    pub(crate) fn frame(v19: bool, payload: &[u8; PAYLOAD_LEN]) -> Vec<u8> {
        let preamble = if v19 { PREAMBLE1_V19 } else { PREAMBLE1_V16 };
        let mut out = vec![preamble, PREAMBLE2, PAYLOAD_LEN as u8];
        out.extend_from_slice(payload);
        let ck = Fletcher8::of(&out[2..]);
        out.extend_from_slice(&[ck.a, ck.b]);
        out
    }

    pub(crate) fn payload(lat: i32, lng: i32, fix: u8) -> [u8; PAYLOAD_LEN] {
        let mut p = [0u8; PAYLOAD_LEN];
        p[0..4].copy_from_slice(&lat.to_le_bytes());
        p[4..8].copy_from_slice(&lng.to_le_bytes());
        p[8..12].copy_from_slice(&5_000i32.to_le_bytes());
        p[12..16].copy_from_slice(&100i32.to_le_bytes());
        p[16..20].copy_from_slice(&18_000i32.to_le_bytes());
        p[20] = 11;
        p[21] = fix;
        // 2015-01-04 00:00:00.000
        p[22..26].copy_from_slice(&40_115u32.to_le_bytes());
        p[26..30].copy_from_slice(&0u32.to_le_bytes());
        p[30..32].copy_from_slice(&120u16.to_le_bytes());
        p
    }

    #[test]
    fn test_detect_both_preambles() {
        for v19 in [false, true] {
            let bytes = frame(v19, &payload(1, 2, 3));
            let mut detect = Mtk19Detect::default();
            let (last, body) = bytes.split_last().unwrap();

            assert!(body.iter().all(|&b| !detect.feed(b)));
            assert!(detect.feed(*last));
            assert_eq!(detect.is_v19(), v19);
        }
    }

    #[test]
    fn test_detect_requires_length_byte() {
        let mut bytes = frame(true, &payload(1, 2, 3));
        bytes[2] = 0x1F;

        let mut detect = Mtk19Detect::default();
        assert!(bytes.iter().all(|&b| !detect.feed(b)));
    }

    #[test]
    fn test_v16_scaling() {
        let mut uart = MockUart::new(UartConfig::gps());
        let mut driver = Mtk19Driver::new();
        let mut state = GpsState::new(0);

        uart.inject_rx_data(&frame(false, &payload(47_397_742, 8_545_594, 2)));
        assert!(driver.read(&mut uart, &mut state, 10));
        assert_eq!(state.location.lat, 473_977_420);
        assert_eq!(state.status, GpsStatus::Fix2D);
    }

    #[test]
    fn test_v19_decode() {
        let mut uart = MockUart::new(UartConfig::gps());
        let mut driver = Mtk19Driver::new();
        let mut state = GpsState::new(0);

        uart.inject_rx_data(&frame(true, &payload(473_977_420, 85_455_940, FIX_3D_SBAS)));
        assert!(driver.read(&mut uart, &mut state, 10));

        assert_eq!(state.status, GpsStatus::Fix3D);
        assert_eq!(state.location.lat, 473_977_420);
        assert_eq!(state.location.lng, 85_455_940);
        assert_eq!(state.location.alt, 5_000);
        assert_eq!(state.num_sats, 11);
        assert_eq!(state.hdop, 120);
        assert_eq!(state.ground_course_cd, 18_000);
        assert!((state.velocity.x + 1.0).abs() < 1e-3);
        // 2015-01-04 is the first day of GPS week 1826
        assert_eq!(state.time_week, 1826);
        assert_eq!(state.time_week_ms, 0);
    }

    #[test]
    fn test_utc_to_gps_rejects_empty_date() {
        assert_eq!(utc_to_gps(0, 123), None);
        assert_eq!(utc_to_gps(11_315, 0), None);
    }
}
