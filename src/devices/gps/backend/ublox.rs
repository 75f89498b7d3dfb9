//! u-blox UBX binary protocol
//!
//! Frame layout: `B5 62 class id len_lo len_hi payload[len] ck_a ck_b`, where
//! the Fletcher checksum covers class through the end of the payload.
//!
//! The driver consumes the navigation messages below and, once connected,
//! streams CFG-MSG rate requests for them followed by a CFG-NAV5 carrying the
//! configured dynamic model.
//!
//! | Message    | Class/ID  | Length |
//! |------------|-----------|--------|
//! | NAV-POSLLH | 0x01 0x02 | 28     |
//! | NAV-STATUS | 0x01 0x03 | 16     |
//! | NAV-SOL    | 0x01 0x06 | 52     |
//! | NAV-VELNED | 0x01 0x12 | 36     |
//!
//! # References
//!
//! - [u-blox 6 Receiver Description (GPS.G6-SW-10018)](https://content.u-blox.com/sites/default/files/products/documents/u-blox6_ReceiverDescrProtSpec_%28GPS.G6-SW-10018%29_Public.pdf)

use nalgebra::Vector3;

use super::{drain_port, le_i32, le_u16, le_u32, Detector, Fletcher8, GpsBackend};
use crate::core::parameters::NavFilter;
use crate::devices::gps::state::{GpsState, GpsStatus};
use crate::platform::traits::UartInterface;

pub const PREAMBLE1: u8 = 0xB5;
pub const PREAMBLE2: u8 = 0x62;

const CLASS_NAV: u8 = 0x01;
const CLASS_CFG: u8 = 0x06;

const MSG_POSLLH: u8 = 0x02;
const MSG_STATUS: u8 = 0x03;
const MSG_SOL: u8 = 0x06;
const MSG_VELNED: u8 = 0x12;

const MSG_CFG_MSG: u8 = 0x01;
const MSG_CFG_NAV5: u8 = 0x24;

const LEN_POSLLH: u16 = 28;
const LEN_STATUS: u16 = 16;
const LEN_SOL: u16 = 52;
const LEN_VELNED: u16 = 36;
const LEN_NAV5: usize = 36;

/// NAV5 `mask` bit selecting the dynamic model field
const NAV5_MASK_DYN: u16 = 0x0001;

/// `gpsFixOk` flag in NAV-STATUS and NAV-SOL
const FLAG_FIX_OK: u8 = 0x01;

const FIX_2D: u8 = 2;
const FIX_3D: u8 = 3;
const FIX_GPS_DR: u8 = 4;

/// Frames with a longer payload are walked but not buffered
const PAYLOAD_MAX: usize = 64;

/// Longest payload the detector will wait for before giving up on a frame
const DETECT_PAYLOAD_MAX: u16 = 512;

/// Enabled navigation messages, requested at one per solution
const NAV_MESSAGES: [u8; 4] = [MSG_POSLLH, MSG_STATUS, MSG_SOL, MSG_VELNED];

/// sync(2) + header(4) + checksum(2)
const FRAME_OVERHEAD: usize = 8;

const CONFIG_CAPACITY: usize = NAV_MESSAGES.len() * (FRAME_OVERHEAD + 3) + FRAME_OVERHEAD + LEN_NAV5;

/// Append a complete UBX frame to `out`
///
/// Returns false, leaving `out` partially written, if it does not fit.
pub(crate) fn encode_frame<const N: usize>(
    out: &mut heapless::Vec<u8, N>,
    class: u8,
    id: u8,
    payload: &[u8],
) -> bool {
    let len = (payload.len() as u16).to_le_bytes();
    let header = [class, id, len[0], len[1]];

    let mut ck = Fletcher8::of(&header);
    for &byte in payload {
        ck.update(byte);
    }

    out.extend_from_slice(&[PREAMBLE1, PREAMBLE2]).is_ok()
        && out.extend_from_slice(&header).is_ok()
        && out.extend_from_slice(payload).is_ok()
        && out.extend_from_slice(&[ck.a, ck.b]).is_ok()
}

/// Scratch state for recognising a UBX frame
#[derive(Debug, Clone, Copy, Default)]
pub struct UbloxDetect {
    step: u8,
    ck: Fletcher8,
    payload_length: u16,
    payload_counter: u16,
}

impl Detector for UbloxDetect {
    fn feed(&mut self, data: u8) -> bool {
        match self.step {
            0 => {
                if data == PREAMBLE1 {
                    self.step = 1;
                }
            }
            1 => {
                if data != PREAMBLE2 {
                    *self = Self::default();
                    return self.feed(data);
                }
                self.step = 2;
            }
            2 | 3 => {
                // class, id
                if self.step == 2 {
                    self.ck = Fletcher8::default();
                }
                self.ck.update(data);
                self.step += 1;
            }
            4 => {
                self.ck.update(data);
                self.payload_length = data as u16;
                self.step = 5;
            }
            5 => {
                self.ck.update(data);
                self.payload_length |= (data as u16) << 8;
                if self.payload_length > DETECT_PAYLOAD_MAX {
                    *self = Self::default();
                    return false;
                }
                self.payload_counter = 0;
                self.step = if self.payload_length == 0 { 7 } else { 6 };
            }
            6 => {
                self.ck.update(data);
                self.payload_counter += 1;
                if self.payload_counter == self.payload_length {
                    self.step = 7;
                }
            }
            7 => {
                if data != self.ck.a {
                    *self = Self::default();
                    return self.feed(data);
                }
                self.step = 8;
            }
            _ => {
                let valid = data == self.ck.b;
                *self = Self::default();
                return valid || self.feed(data);
            }
        }
        false
    }
}

/// UBX protocol driver
#[derive(Debug)]
pub struct UbloxDriver {
    step: u8,
    class: u8,
    id: u8,
    payload_length: u16,
    payload_counter: u16,
    ck: Fletcher8,
    payload: [u8; PAYLOAD_MAX],
    new_position: bool,
    new_speed: bool,
    config: heapless::Vec<u8, CONFIG_CAPACITY>,
    config_sent: usize,
}

impl UbloxDriver {
    /// Create a driver that will configure the receiver for `nav_filter`
    pub fn new(nav_filter: NavFilter) -> Self {
        let mut config = heapless::Vec::new();

        let mut complete = NAV_MESSAGES
            .iter()
            .all(|&msg| encode_frame(&mut config, CLASS_CFG, MSG_CFG_MSG, &[CLASS_NAV, msg, 1]));

        if let Some(dyn_model) = nav_filter.dyn_model() {
            let mut nav5 = [0u8; LEN_NAV5];
            nav5[..2].copy_from_slice(&NAV5_MASK_DYN.to_le_bytes());
            nav5[2] = dyn_model;
            complete &= encode_frame(&mut config, CLASS_CFG, MSG_CFG_NAV5, &nav5);
        }

        if !complete {
            crate::log_warn!("GPS: u-blox config truncated");
        }

        Self {
            step: 0,
            class: 0,
            id: 0,
            payload_length: 0,
            payload_counter: 0,
            ck: Fletcher8::default(),
            payload: [0; PAYLOAD_MAX],
            new_position: false,
            new_speed: false,
            config,
            config_sent: 0,
        }
    }

    /// Configuration bytes not yet handed to the port
    pub fn config_pending(&self) -> usize {
        self.config.len() - self.config_sent
    }

    fn restart(&mut self) {
        self.step = 0;
    }

    /// Feed one byte, returning true when it completes a position+velocity pair
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
                    self.restart();
                    return self.parse(data, state, now_ms);
                }
            }
            2 => {
                self.ck = Fletcher8::default();
                self.ck.update(data);
                self.class = data;
                self.step = 3;
            }
            3 => {
                self.ck.update(data);
                self.id = data;
                self.step = 4;
            }
            4 => {
                self.ck.update(data);
                self.payload_length = data as u16;
                self.step = 5;
            }
            5 => {
                self.ck.update(data);
                self.payload_length |= (data as u16) << 8;
                self.payload_counter = 0;
                self.step = if self.payload_length == 0 { 7 } else { 6 };
            }
            6 => {
                self.ck.update(data);
                let index = self.payload_counter as usize;
                if index < PAYLOAD_MAX {
                    self.payload[index] = data;
                }
                self.payload_counter += 1;
                if self.payload_counter == self.payload_length {
                    self.step = 7;
                }
            }
            7 => {
                if data == self.ck.a {
                    self.step = 8;
                } else {
                    crate::log_debug!("GPS: UBX bad checksum A");
                    self.restart();
                }
            }
            _ => {
                self.restart();
                if data != self.ck.b {
                    crate::log_debug!("GPS: UBX bad checksum B");
                    return false;
                }
                if self.handle_message(state) && self.new_position && self.new_speed {
                    self.new_position = false;
                    self.new_speed = false;
                    state.last_gps_time_ms = now_ms;
                    return true;
                }
            }
        }
        false
    }

    /// Apply a checksum-valid frame to `state`
    fn handle_message(&mut self, state: &mut GpsState) -> bool {
        if self.class != CLASS_NAV {
            return false;
        }

        let p = &self.payload;
        match (self.id, self.payload_length) {
            (MSG_POSLLH, LEN_POSLLH) => {
                state.time_week_ms = le_u32(p, 0);
                state.location.lng = le_i32(p, 4);
                state.location.lat = le_i32(p, 8);
                // hMSL is in mm
                state.location.alt = le_i32(p, 16) / 10;
                self.new_position = true;
            }
            (MSG_STATUS, LEN_STATUS) => {
                state.status = fix_status(p[4], p[5]);
            }
            (MSG_SOL, LEN_SOL) => {
                state.status = fix_status(p[10], p[11]);
                state.time_week_ms = le_u32(p, 0);
                state.time_week = le_u16(p, 8);
                state.hdop = le_u16(p, 44);
                state.num_sats = p[47];
            }
            (MSG_VELNED, LEN_VELNED) => {
                // cm/s and 1e-5 degrees
                state.ground_speed = le_u32(p, 20) as f32 * 0.01;
                state.ground_course_cd = le_i32(p, 24) / 1000;
                state.velocity = Vector3::new(
                    le_i32(p, 4) as f32 * 0.01,
                    le_i32(p, 8) as f32 * 0.01,
                    le_i32(p, 12) as f32 * 0.01,
                );
                state.have_vertical_velocity = true;
                self.new_speed = true;
            }
            _ => return false,
        }
        true
    }
}

fn fix_status(fix_type: u8, flags: u8) -> GpsStatus {
    if flags & FLAG_FIX_OK == 0 {
        return GpsStatus::NoFix;
    }
    match fix_type {
        FIX_3D | FIX_GPS_DR => GpsStatus::Fix3D,
        FIX_2D => GpsStatus::Fix2D,
        _ => GpsStatus::NoFix,
    }
}

impl GpsBackend for UbloxDriver {
    fn read<U: UartInterface>(&mut self, port: &mut U, state: &mut GpsState, now_ms: u64) -> bool {
        let mut parsed = false;
        drain_port(port, |byte| parsed |= self.parse(byte, state, now_ms));
        parsed
    }

    fn configure<U: UartInterface>(&mut self, port: &mut U) {
        let rest = &self.config[self.config_sent..];
        if rest.is_empty() {
            return;
        }

        let space = port.tx_space().min(rest.len());
        if space == 0 {
            return;
        }

        match port.write(&rest[..space]) {
            Ok(written) => {
                self.config_sent += written.min(space);
                if self.config_sent == self.config.len() {
                    crate::log_debug!("GPS: u-blox config sent ({} bytes)", self.config_sent);
                }
            }
            Err(e) => crate::log_warn!("GPS: u-blox config write failed: {}", e),
        }
    }
}
