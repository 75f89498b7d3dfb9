//! GPS protocol backends
//!
//! Each supported protocol family provides two pieces:
//!
//! - a **detector**: a small scratch struct fed one byte at a time that reports
//!   `true` on the last byte of the first complete, checksum-valid frame
//! - a **driver**: the stateful reader constructed once the detector fired,
//!   which drains the port and updates the instance's [`GpsState`]
//!
//! Drivers are held as the tagged enum [`GpsDriver`], one optional slot per
//! GPS instance, so no allocator is needed.

pub mod mtk;
pub mod mtk19;
pub mod nmea;
#[cfg(feature = "gps-sirf")]
pub mod sirf;
pub mod ublox;

use super::state::GpsState;
use crate::core::parameters::GpsParams;
use crate::platform::traits::UartInterface;

pub use mtk::{MtkDetect, MtkDriver};
pub use mtk19::{Mtk19Detect, Mtk19Driver};
pub use nmea::{NmeaDetect, NmeaDriver};
#[cfg(feature = "gps-sirf")]
pub use sirf::{SirfDetect, SirfDriver};
pub use ublox::{UbloxDetect, UbloxDriver};

/// Wire protocol spoken by a receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpsProtocol {
    /// u-blox UBX binary
    Ublox,
    /// MediaTek v1.4 custom binary
    Mtk,
    /// MediaTek v1.6/v1.9 binary
    Mtk19,
    /// SiRF binary
    Sirf,
    /// NMEA-0183 sentences
    Nmea,
}

/// Incremental protocol detector
///
/// Implementors keep their partial-match state between calls. A fresh
/// `Default` value is the "nothing seen yet" state.
pub trait Detector: Default {
    /// Feed one received byte, returning true once the protocol is confirmed
    fn feed(&mut self, data: u8) -> bool;
}

/// Protocol driver contract
pub trait GpsBackend {
    /// Drain the bytes currently buffered on `port` and update `state`
    ///
    /// Returns true if at least one complete message updated `state`. Must not
    /// block and must not wait for bytes that have not arrived yet.
    fn read<U: UartInterface>(&mut self, port: &mut U, state: &mut GpsState, now_ms: u64) -> bool;

    /// Push any receiver configuration the driver still owes the link
    ///
    /// Called only while no other data is being streamed to the port.
    fn configure<U: UartInterface>(&mut self, _port: &mut U) {}
}

/// The driver owned by a GPS instance once its protocol is known
#[derive(Debug)]
pub enum GpsDriver {
    Ublox(UbloxDriver),
    Mtk(MtkDriver),
    Mtk19(Mtk19Driver),
    #[cfg(feature = "gps-sirf")]
    Sirf(SirfDriver),
    Nmea(NmeaDriver),
}

impl GpsDriver {
    /// Construct the driver for a detected protocol
    ///
    /// Returns `None` only for protocols compiled out of this build.
    pub fn for_protocol(protocol: GpsProtocol, params: &GpsParams) -> Option<Self> {
        match protocol {
            GpsProtocol::Ublox => Some(GpsDriver::Ublox(UbloxDriver::new(params.nav_filter))),
            GpsProtocol::Mtk => Some(GpsDriver::Mtk(MtkDriver::new())),
            GpsProtocol::Mtk19 => Some(GpsDriver::Mtk19(Mtk19Driver::new())),
            #[cfg(feature = "gps-sirf")]
            GpsProtocol::Sirf => Some(GpsDriver::Sirf(SirfDriver::new())),
            #[cfg(not(feature = "gps-sirf"))]
            GpsProtocol::Sirf => None,
            GpsProtocol::Nmea => Some(GpsDriver::Nmea(NmeaDriver::new())),
        }
    }

    /// Protocol this driver speaks
    pub fn protocol(&self) -> GpsProtocol {
        match self {
            GpsDriver::Ublox(_) => GpsProtocol::Ublox,
            GpsDriver::Mtk(_) => GpsProtocol::Mtk,
            GpsDriver::Mtk19(_) => GpsProtocol::Mtk19,
            #[cfg(feature = "gps-sirf")]
            GpsDriver::Sirf(_) => GpsProtocol::Sirf,
            GpsDriver::Nmea(_) => GpsProtocol::Nmea,
        }
    }
}

impl GpsBackend for GpsDriver {
    fn read<U: UartInterface>(&mut self, port: &mut U, state: &mut GpsState, now_ms: u64) -> bool {
        match self {
            GpsDriver::Ublox(d) => d.read(port, state, now_ms),
            GpsDriver::Mtk(d) => d.read(port, state, now_ms),
            GpsDriver::Mtk19(d) => d.read(port, state, now_ms),
            #[cfg(feature = "gps-sirf")]
            GpsDriver::Sirf(d) => d.read(port, state, now_ms),
            GpsDriver::Nmea(d) => d.read(port, state, now_ms),
        }
    }

    fn configure<U: UartInterface>(&mut self, port: &mut U) {
        match self {
            GpsDriver::Ublox(d) => d.configure(port),
            GpsDriver::Mtk(d) => d.configure(port),
            GpsDriver::Mtk19(d) => d.configure(port),
            #[cfg(feature = "gps-sirf")]
            GpsDriver::Sirf(d) => d.configure(port),
            GpsDriver::Nmea(d) => d.configure(port),
        }
    }
}

/// Call `f` for every byte that was buffered on `port` when the call started
///
/// Read errors end the drain for this call.
pub(crate) fn drain_port<U: UartInterface>(port: &mut U, mut f: impl FnMut(u8)) {
    let mut pending = port.available();
    let mut buf = [0u8; 64];

    while pending > 0 {
        let want = pending.min(buf.len());
        let count = match port.read(&mut buf[..want]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                crate::log_warn!("GPS: UART read failed: {}", e);
                break;
            }
        };

        for &byte in &buf[..count] {
            f(byte);
        }
        pending = pending.saturating_sub(count);
    }
}

/// 8-bit Fletcher checksum used by UBX and MediaTek binary frames
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fletcher8 {
    pub a: u8,
    pub b: u8,
}

impl Fletcher8 {
    /// Add one byte to the running checksum
    pub fn update(&mut self, byte: u8) {
        self.a = self.a.wrapping_add(byte);
        self.b = self.b.wrapping_add(self.a);
    }

    /// Checksum of a whole slice
    pub fn of(data: &[u8]) -> Self {
        let mut ck = Self::default();
        for &byte in data {
            ck.update(byte);
        }
        ck
    }
}

pub(crate) fn le_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

pub(crate) fn le_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

pub(crate) fn le_i32(buf: &[u8], at: usize) -> i32 {
    le_u32(buf, at) as i32
}

#[cfg(feature = "gps-sirf")]
pub(crate) fn be_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([buf[at], buf[at + 1]])
}

#[cfg(feature = "gps-sirf")]
pub(crate) fn be_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

#[cfg(feature = "gps-sirf")]
pub(crate) fn be_i32(buf: &[u8], at: usize) -> i32 {
    be_u32(buf, at) as i32
}

const MS_PER_DAY: u64 = 86_400_000;
const MS_PER_WEEK: u64 = 7 * MS_PER_DAY;

/// Days from 1970-01-01 to the GPS epoch, 1980-01-06
const GPS_EPOCH_UNIX_DAYS: i64 = 3657;

/// Split milliseconds since the GPS epoch into (week, milliseconds of week)
pub fn gps_week_from_epoch_ms(epoch_ms: u64) -> (u16, u32) {
    let week = epoch_ms / MS_PER_WEEK;
    ((week as u16), (epoch_ms - week * MS_PER_WEEK) as u32)
}

/// GPS week and week milliseconds from a UTC calendar date and time
///
/// Leap seconds are not applied. Returns `None` for dates before the GPS
/// epoch.
pub fn gps_time_from_utc(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    millis_of_minute: u32,
) -> Option<(u16, u32)> {
    let days = days_from_civil(year, month, day) - GPS_EPOCH_UNIX_DAYS;
    if days < 0 {
        return None;
    }

    let ms = days as u64 * MS_PER_DAY
        + hour as u64 * 3_600_000
        + minute as u64 * 60_000
        + millis_of_minute as u64;
    Some(gps_week_from_epoch_ms(ms))
}

/// Days since 1970-01-01 for a proleptic Gregorian date
fn days_from_civil(year: i32, month: u32, day: u32) -> i64 {
    let y = i64::from(if month <= 2 { year - 1 } else { year });
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let m = month as i64;
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::MockUart;
    use crate::platform::traits::UartConfig;

    #[test]
    fn test_fletcher_matches_cfg_msg() {
        // Class=0x06, ID=0x01, Len=0x0003, Payload=0x01,0x06,0x01
        let ck = Fletcher8::of(&[0x06, 0x01, 0x03, 0x00, 0x01, 0x06, 0x01]);
        assert_eq!((ck.a, ck.b), (0x12, 0x4F));
    }

    #[test]
    fn test_drain_port_only_takes_pending_bytes() {
        let mut uart = MockUart::new(UartConfig::gps());
        uart.inject_rx_data(&[1u8; 150]);

        let mut seen = 0;
        drain_port(&mut uart, |_| seen += 1);
        assert_eq!(seen, 150);
        assert_eq!(uart.available(), 0);
    }

    #[test]
    fn test_days_from_civil() {
        assert_eq!(days_from_civil(1970, 1, 1), 0);
        assert_eq!(days_from_civil(1980, 1, 6), GPS_EPOCH_UNIX_DAYS);
        assert_eq!(days_from_civil(2000, 3, 1), 11_017);
    }

    #[test]
    fn test_gps_time_from_utc() {
        // 1980-01-13 00:00:10 is 10 s into week 1
        assert_eq!(gps_time_from_utc(1980, 1, 13, 0, 0, 10_000), Some((1, 10_000)));
        assert_eq!(gps_time_from_utc(1979, 12, 31, 0, 0, 0), None);
    }

    #[test]
    fn test_gps_week_from_epoch_ms() {
        let epoch_ms = 3 * MS_PER_WEEK + 1234;
        assert_eq!(gps_week_from_epoch_ms(epoch_ms), (3, 1234));
    }

    #[test]
    fn test_driver_protocol() {
        let params = GpsParams::default();
        let driver = GpsDriver::for_protocol(GpsProtocol::Mtk19, &params).unwrap();
        assert_eq!(driver.protocol(), GpsProtocol::Mtk19);
    }
}
