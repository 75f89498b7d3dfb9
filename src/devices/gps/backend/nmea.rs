//! NMEA-0183 sentences
//!
//! Detection only needs one checksum-valid sentence of any type. The driver
//! hands bytes to the `nmea0183` parser and uses:
//!
//! - **GGA**: position, altitude, satellite count, HDOP, fix quality
//! - **GSA**: fix dimension (2D or 3D)
//! - **RMC**: speed and course over ground
//! - **VTG**: speed and course over ground (backup)
//!
//! GGA only says whether a fix exists. Its dimension comes from the most
//! recent GSA; receivers that never send GSA are reported as 3D, since the
//! parser only yields a GGA record when the altitude field is present.

use nmea0183::{FixType, GPSQuality, ParseResult, Parser};

use super::{drain_port, Detector, GpsBackend};
use crate::devices::gps::state::{GpsState, GpsStatus, Location};
use crate::platform::traits::UartInterface;

/// Knots to m/s
const KNOTS_TO_MS: f32 = 0.514_444;

/// Longest sentence body worth following; anything longer is noise
const MAX_SENTENCE: u8 = 96;

/// Scratch state for recognising an NMEA sentence
#[derive(Debug, Clone, Copy, Default)]
pub struct NmeaDetect {
    step: u8,
    checksum: u8,
    length: u8,
    received: u8,
}

impl Detector for NmeaDetect {
    fn feed(&mut self, data: u8) -> bool {
        if data == b'$' {
            *self = Self {
                step: 1,
                ..Self::default()
            };
            return false;
        }

        match self.step {
            0 => {}
            1 => {
                if data == b'*' {
                    self.step = 2;
                } else if self.length >= MAX_SENTENCE {
                    *self = Self::default();
                } else {
                    self.checksum ^= data;
                    self.length += 1;
                }
            }
            2 => match (data as char).to_digit(16) {
                Some(nibble) => {
                    self.received = (nibble as u8) << 4;
                    self.step = 3;
                }
                None => *self = Self::default(),
            },
            _ => {
                let valid = (data as char)
                    .to_digit(16)
                    .map(|nibble| (self.received | nibble as u8) == self.checksum)
                    .unwrap_or(false);
                *self = Self::default();
                return valid;
            }
        }
        false
    }
}

/// NMEA-0183 driver
pub struct NmeaDriver {
    parser: Parser,
    fix_2d: bool,
}

impl core::fmt::Debug for NmeaDriver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NmeaDriver").finish_non_exhaustive()
    }
}

impl Default for NmeaDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl NmeaDriver {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
            fix_2d: false,
        }
    }

    fn update_from_gga(&self, state: &mut GpsState, gga: &nmea0183::GGA) {
        state.num_sats = gga.sat_in_use;

        if gga.gps_quality == GPSQuality::NoFix {
            state.status = GpsStatus::NoFix;
            return;
        }

        state.location = Location::from_degrees(gga.latitude.as_f64(), gga.longitude.as_f64(), gga.altitude.meters);
        state.hdop = libm::roundf(gga.hdop * 100.0) as u16;
        state.status = if self.fix_2d {
            GpsStatus::Fix2D
        } else {
            GpsStatus::Fix3D
        };
    }

    fn update_ground_track(state: &mut GpsState, speed_knots: f32, course_deg: Option<f32>) {
        state.ground_speed = speed_knots * KNOTS_TO_MS;
        // Receivers usually omit the course when stationary; keep the last one
        if let Some(degrees) = course_deg {
            state.ground_course_cd = (libm::roundf(degrees * 100.0) as i32).rem_euclid(36_000);
        }
        state.velocity_from_ground_course();
    }

    fn parse(&mut self, byte: u8, state: &mut GpsState, now_ms: u64) -> bool {
        let updated = match self.parser.parse_from_byte(byte) {
            Some(Ok(ParseResult::GGA(Some(gga)))) => {
                self.update_from_gga(state, &gga);
                true
            }
            Some(Ok(ParseResult::GGA(None))) => {
                state.status = GpsStatus::NoFix;
                true
            }
            Some(Ok(ParseResult::GSA(Some(gsa)))) => {
                self.fix_2d = gsa.fix_type == FixType::Fix2D;
                true
            }
            Some(Ok(ParseResult::RMC(Some(rmc)))) => {
                Self::update_ground_track(state, rmc.speed.as_knots(), rmc.course.as_ref().map(|c| c.degrees));
                true
            }
            Some(Ok(ParseResult::VTG(Some(vtg)))) => {
                Self::update_ground_track(state, vtg.speed.as_knots(), vtg.course.as_ref().map(|c| c.degrees));
                true
            }
            // Valid sentence but no data, or other sentence types
            _ => false,
        };

        if updated {
            state.last_gps_time_ms = now_ms;
        }
        updated
    }
}

impl GpsBackend for NmeaDriver {
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

    pub(crate) const GGA: &[u8] =
        b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n";
    const RMC: &[u8] = b"$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A\r\n";
    const VTG: &[u8] = b"$GPVTG,089.0,T,,,15.2,N,,,A*12\r\n";
    const VTG_NO_COG: &[u8] = b"$GPVTG,,T,,,0.0,N,,,A*0B\r\n";
    const GGA_NO_FIX: &[u8] =
        b"$GPGGA,123519,4807.038,N,01131.000,E,0,00,99.9,545.4,M,46.9,M,,*7E\r\n";
    const GSA_2D: &[u8] = b"$GPGSA,A,2,04,05,09,,,,,,,,,,2.5,1.3,2.1*3D\r\n";
    const GSA_3D: &[u8] = b"$GPGSA,A,3,04,05,09,12,,,,,,,,,1.8,1.0,1.5*35\r\n";

    fn hits(detect: &mut NmeaDetect, bytes: &[u8]) -> Vec<usize> {
        bytes
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| detect.feed(b).then_some(i))
            .collect()
    }

    #[test]
    fn test_detect_on_second_checksum_digit() {
        let mut detect = NmeaDetect::default();
        // '7' of "*47" is the last checksum digit
        let star = GGA.iter().position(|&b| b == b'*').unwrap();
        assert_eq!(hits(&mut detect, GGA), vec![star + 2]);
    }

    #[test]
    fn test_detect_lowercase_hex() {
        let mut detect = NmeaDetect::default();
        let sentence = b"$PGCMD,16,0,0,0,0,0*6a";
        assert_eq!(hits(&mut detect, sentence), vec![sentence.len() - 1]);
    }

    #[test]
    fn test_detect_bad_checksum() {
        let mut detect = NmeaDetect::default();
        assert!(hits(&mut detect, b"$GPVTG,089.0,T,,,15.2,N,,,A*13").is_empty());
        assert!(hits(&mut detect, b"$GPVTG,089.0,T,,,15.2,N,,,A*1G").is_empty());
    }

    #[test]
    fn test_detect_restarts_on_dollar() {
        let mut detect = NmeaDetect::default();
        let mut stream = b"$GARBAGE,1,2".to_vec();
        stream.extend_from_slice(VTG);
        assert_eq!(hits(&mut detect, &stream).len(), 1);
    }

    #[test]
    fn test_driver_gga() {
        let mut uart = MockUart::new(UartConfig::gps());
        let mut driver = NmeaDriver::new();
        let mut state = GpsState::new(0);

        uart.inject_rx_data(GGA);
        assert!(driver.read(&mut uart, &mut state, 77));

        assert_eq!(state.status, GpsStatus::Fix3D);
        assert!((state.location.lat_deg() - 48.1173).abs() < 0.001);
        assert!((state.location.lng_deg() - 11.516_666).abs() < 0.001);
        assert_eq!(state.location.alt, 54_540);
        assert_eq!(state.num_sats, 8);
        assert_eq!(state.hdop, 90);
        assert_eq!(state.last_gps_time_ms, 77);
    }

    #[test]
    fn test_driver_gga_without_fix() {
        let mut uart = MockUart::new(UartConfig::gps());
        let mut driver = NmeaDriver::new();
        let mut state = GpsState::new(0);

        uart.inject_rx_data(GGA);
        assert!(driver.read(&mut uart, &mut state, 0));
        assert_eq!(state.status, GpsStatus::Fix3D);

        // Still a received message, but the fix is gone
        uart.inject_rx_data(GGA_NO_FIX);
        assert!(driver.read(&mut uart, &mut state, 10));
        assert_eq!(state.status, GpsStatus::NoFix);
        assert_eq!(state.num_sats, 0);
        assert_eq!(state.last_gps_time_ms, 10);
    }

    #[test]
    fn test_driver_gsa_sets_fix_dimension() {
        let mut uart = MockUart::new(UartConfig::gps());
        let mut driver = NmeaDriver::new();
        let mut state = GpsState::new(0);

        uart.inject_rx_data(GSA_2D);
        uart.inject_rx_data(GGA);
        assert!(driver.read(&mut uart, &mut state, 0));
        assert_eq!(state.status, GpsStatus::Fix2D);

        uart.inject_rx_data(GSA_3D);
        uart.inject_rx_data(GGA);
        assert!(driver.read(&mut uart, &mut state, 0));
        assert_eq!(state.status, GpsStatus::Fix3D);
    }

    #[test]
    fn test_driver_rmc_speed_and_course() {
        let mut uart = MockUart::new(UartConfig::gps());
        let mut driver = NmeaDriver::new();
        let mut state = GpsState::new(0);

        uart.inject_rx_data(RMC);
        assert!(driver.read(&mut uart, &mut state, 0));

        // 22.4 knots * 0.514444 = ~11.52 m/s
        assert!((state.ground_speed - 11.52).abs() < 0.1);
        assert_eq!(state.ground_course_cd, 8440);
        assert!(!state.have_vertical_velocity);
    }

    #[test]
    fn test_driver_vtg_without_cog_keeps_course() {
        let mut uart = MockUart::new(UartConfig::gps());
        let mut driver = NmeaDriver::new();
        let mut state = GpsState::new(0);

        uart.inject_rx_data(VTG);
        assert!(driver.read(&mut uart, &mut state, 0));
        assert!((state.ground_speed - 7.82).abs() < 0.1);
        assert_eq!(state.ground_course_cd, 8900);

        uart.inject_rx_data(VTG_NO_COG);
        assert!(driver.read(&mut uart, &mut state, 0));
        assert!(state.ground_speed.abs() < 0.01);
        assert_eq!(state.ground_course_cd, 8900);
    }

    #[test]
    fn test_driver_split_sentence() {
        let mut uart = MockUart::new(UartConfig::gps());
        let mut driver = NmeaDriver::new();
        let mut state = GpsState::new(0);

        uart.inject_rx_data(&GGA[..20]);
        assert!(!driver.read(&mut uart, &mut state, 0));
        uart.inject_rx_data(&GGA[20..]);
        assert!(driver.read(&mut uart, &mut state, 0));
    }
}
