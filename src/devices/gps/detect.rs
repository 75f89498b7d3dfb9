//! Protocol auto-detection
//!
//! While an instance has no driver, every tick runs one [`DetectState::step`]:
//! cycle the port through the candidate baud rates, stream the init blob, and
//! feed each received byte to the enabled protocol detectors in priority
//! order. The first detector to see a complete, checksum-valid frame wins.
//!
//! # Priority
//!
//! | Order | Protocol | Gate                                   |
//! |-------|----------|----------------------------------------|
//! | 1     | UBX      | current baud >= 38400                  |
//! | 2     | MTK19    |                                        |
//! | 3     | MTK      |                                        |
//! | 4     | SiRF     | `gps-sirf` feature                     |
//! | 5     | NMEA     | more than 5000 ms since detection start |
//!
//! Binary protocols with long sync sequences go first. NMEA is the loosest
//! match and receivers chatter NMEA at boot before switching to binary, so it
//! is held back until the others had a chance.

use super::backend::{Detector, GpsProtocol, Mtk19Detect, MtkDetect, NmeaDetect, UbloxDetect};
#[cfg(feature = "gps-sirf")]
use super::backend::SirfDetect;
use super::blob::{BlobStream, INIT_BLOB};
use crate::core::parameters::GpsType;
use crate::platform::traits::UartInterface;

/// Candidate baud rates, tried in order
pub const DETECT_BAUDRATES: [u32; 4] = [4800, 38400, 57600, 9600];

/// Time spent on one baud rate before moving to the next
pub const BAUD_CHANGE_MS: u64 = 1200;

/// Time after detection start before NMEA may match
pub const NMEA_SETTLE_MS: u64 = 5000;

/// Lowest baud rate at which UBX frames are trusted
pub const UBLOX_MIN_BAUD: u32 = 38400;

/// Detection scratch state for one instance
///
/// A fresh value is installed whenever detection (re)starts.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectState {
    baud_index: usize,
    last_baud_change_ms: u64,
    detect_started_ms: Option<u64>,
    ublox: UbloxDetect,
    mtk19: Mtk19Detect,
    mtk: MtkDetect,
    #[cfg(feature = "gps-sirf")]
    sirf: SirfDetect,
    nmea: NmeaDetect,
}

impl DetectState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidate baud rate currently being tried
    pub fn baud_rate(&self) -> u32 {
        DETECT_BAUDRATES[self.baud_index]
    }

    /// Index into [`DETECT_BAUDRATES`]
    pub fn baud_index(&self) -> usize {
        self.baud_index
    }

    /// System time of the first detection step, if one has run
    pub fn started_ms(&self) -> Option<u64> {
        self.detect_started_ms
    }

    /// Run one detection step
    ///
    /// Returns the detected protocol, leaving any bytes after the matching
    /// frame unread for the driver.
    pub fn step<U: UartInterface>(
        &mut self,
        port: &mut U,
        blob: &mut BlobStream,
        selector: GpsType,
        now_ms: u64,
    ) -> Option<GpsProtocol> {
        let started_ms = *self.detect_started_ms.get_or_insert(now_ms);

        if now_ms.saturating_sub(self.last_baud_change_ms) >= BAUD_CHANGE_MS {
            self.next_baud(port, now_ms);
            blob.start(INIT_BLOB);
        }

        blob.advance(port);

        let elapsed_ms = now_ms.saturating_sub(started_ms);
        while port.available() > 0 {
            let byte = match port.read_byte() {
                Ok(Some(byte)) => byte,
                Ok(None) => break,
                Err(e) => {
                    crate::log_warn!("GPS: UART read failed: {}", e);
                    break;
                }
            };

            if let Some(protocol) = self.feed(byte, selector, elapsed_ms) {
                return Some(protocol);
            }
        }

        None
    }

    fn next_baud<U: UartInterface>(&mut self, port: &mut U, now_ms: u64) {
        self.baud_index = (self.baud_index + 1) % DETECT_BAUDRATES.len();
        self.last_baud_change_ms = now_ms;

        let baud = self.baud_rate();
        if let Err(e) = port.set_baud_rate(baud) {
            crate::log_warn!("GPS: failed to set {} baud: {}", baud, e);
        }
        crate::log_debug!("GPS: trying {} baud", baud);

        self.reset_detectors();
    }

    fn reset_detectors(&mut self) {
        self.ublox = UbloxDetect::default();
        self.mtk19 = Mtk19Detect::default();
        self.mtk = MtkDetect::default();
        #[cfg(feature = "gps-sirf")]
        {
            self.sirf = SirfDetect::default();
        }
        self.nmea = NmeaDetect::default();
    }

    /// Offer one byte to the enabled detectors, highest priority first
    fn feed(&mut self, data: u8, selector: GpsType, elapsed_ms: u64) -> Option<GpsProtocol> {
        if selector.enables(GpsProtocol::Ublox) && self.baud_rate() >= UBLOX_MIN_BAUD && self.ublox.feed(data) {
            return Some(GpsProtocol::Ublox);
        }
        if selector.enables(GpsProtocol::Mtk19) && self.mtk19.feed(data) {
            return Some(GpsProtocol::Mtk19);
        }
        if selector.enables(GpsProtocol::Mtk) && self.mtk.feed(data) {
            return Some(GpsProtocol::Mtk);
        }
        #[cfg(feature = "gps-sirf")]
        if selector.enables(GpsProtocol::Sirf) && self.sirf.feed(data) {
            return Some(GpsProtocol::Sirf);
        }
        if selector.enables(GpsProtocol::Nmea) && elapsed_ms > NMEA_SETTLE_MS && self.nmea.feed(data) {
            return Some(GpsProtocol::Nmea);
        }
        None
    }
}
