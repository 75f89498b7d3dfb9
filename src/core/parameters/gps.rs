//! GPS Parameter Definitions
//!
//! Defines GPS parameters following ArduPilot standards.
//!
//! # Parameters
//!
//! - `GPS_TYPE` - Protocol of the first GPS (0=None, 1=Auto, 2=uBlox, 3=MTK,
//!   4=MTK19, 5=NMEA, 6=SiRF) (**visible in GCS**)
//! - `GPS_TYPE2` - Protocol of the second GPS (same values) (**visible in GCS**)
//! - `GPS_NAVFILTER` - u-blox navigation engine dynamic model (**visible in GCS**)
//!
//! # ArduPilot Compatibility
//!
//! Names and values match ArduPilot's `AP_GPS` parameter group.

use super::error::ParameterError;
use super::storage::{ParamFlags, ParamValue, ParameterStore};
use crate::devices::gps::{GpsProtocol, GPS_MAX_INSTANCES};

/// Parameter name per GPS instance
const TYPE_PARAM_NAMES: [&str; GPS_MAX_INSTANCES] = ["GPS_TYPE", "GPS_TYPE2"];

/// Default protocol selector per GPS instance
const DEFAULT_TYPES: [GpsType; GPS_MAX_INSTANCES] = [GpsType::Auto, GpsType::None];

const NAVFILTER_PARAM_NAME: &str = "GPS_NAVFILTER";

const DEFAULT_NAV_FILTER: NavFilter = NavFilter::Airborne4G;

/// Protocol selector for one GPS instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpsType {
    /// Instance disabled
    None = 0,
    /// Detect any supported protocol
    Auto = 1,
    /// u-blox UBX binary
    Ublox = 2,
    /// MediaTek v1.4 custom binary
    Mtk = 3,
    /// MediaTek v1.6/v1.9 binary
    Mtk19 = 4,
    /// NMEA-0183 sentences
    Nmea = 5,
    /// SiRF binary
    Sirf = 6,
}

impl GpsType {
    /// Convert a stored parameter value, `None` for unknown values
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(GpsType::None),
            1 => Some(GpsType::Auto),
            2 => Some(GpsType::Ublox),
            3 => Some(GpsType::Mtk),
            4 => Some(GpsType::Mtk19),
            5 => Some(GpsType::Nmea),
            6 => Some(GpsType::Sirf),
            _ => None,
        }
    }

    /// Whether a detector for `protocol` may run under this selector
    pub fn enables(self, protocol: GpsProtocol) -> bool {
        match self {
            GpsType::None => false,
            GpsType::Auto => true,
            GpsType::Ublox => protocol == GpsProtocol::Ublox,
            GpsType::Mtk => protocol == GpsProtocol::Mtk,
            GpsType::Mtk19 => protocol == GpsProtocol::Mtk19,
            GpsType::Nmea => protocol == GpsProtocol::Nmea,
            GpsType::Sirf => protocol == GpsProtocol::Sirf,
        }
    }
}

/// u-blox navigation engine dynamic model (UBX-CFG-NAV5 `dynModel`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NavFilter {
    /// Leave the receiver's setting alone
    None = -1,
    Portable = 0,
    Stationary = 2,
    Pedestrian = 3,
    Automotive = 4,
    Sea = 5,
    Airborne1G = 6,
    Airborne2G = 7,
    Airborne4G = 8,
}

impl NavFilter {
    /// Convert a stored parameter value, `None` for unknown values
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            -1 => Some(NavFilter::None),
            0 => Some(NavFilter::Portable),
            2 => Some(NavFilter::Stationary),
            3 => Some(NavFilter::Pedestrian),
            4 => Some(NavFilter::Automotive),
            5 => Some(NavFilter::Sea),
            6 => Some(NavFilter::Airborne1G),
            7 => Some(NavFilter::Airborne2G),
            8 => Some(NavFilter::Airborne4G),
            _ => None,
        }
    }

    /// `dynModel` byte for CFG-NAV5, `None` when the receiver is left alone
    pub fn dyn_model(self) -> Option<u8> {
        match self {
            NavFilter::None => None,
            other => Some(other as i8 as u8),
        }
    }
}

/// GPS parameters loaded from parameter store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpsParams {
    /// Protocol selector per instance (ArduPilot: GPS_TYPE, GPS_TYPE2)
    pub gps_type: [GpsType; GPS_MAX_INSTANCES],
    /// Navigation engine setting (ArduPilot: GPS_NAVFILTER)
    pub nav_filter: NavFilter,
}

impl Default for GpsParams {
    fn default() -> Self {
        Self {
            gps_type: DEFAULT_TYPES,
            nav_filter: DEFAULT_NAV_FILTER,
        }
    }
}

impl GpsParams {
    /// Register GPS parameters with default values
    pub fn register_defaults(store: &mut ParameterStore) -> Result<(), ParameterError> {
        for (name, default) in TYPE_PARAM_NAMES.iter().zip(DEFAULT_TYPES) {
            store.register(name, ParamValue::Int(default as i32), ParamFlags::empty())?;
        }

        store.register(
            NAVFILTER_PARAM_NAME,
            ParamValue::Int(DEFAULT_NAV_FILTER as i32),
            ParamFlags::empty(),
        )?;

        Ok(())
    }

    /// Load GPS parameters from parameter store
    ///
    /// Missing entries fall back to defaults; unknown selector values disable
    /// the instance rather than guessing a protocol.
    pub fn from_store(store: &ParameterStore) -> Self {
        let mut params = Self::default();

        for (slot, name) in params.gps_type.iter_mut().zip(TYPE_PARAM_NAMES) {
            if let Some(value) = store.get(name) {
                *slot = GpsType::from_i32(value.as_i32()).unwrap_or(GpsType::None);
            }
        }

        params.nav_filter = store
            .get(NAVFILTER_PARAM_NAME)
            .and_then(|v| NavFilter::from_i32(v.as_i32()))
            .unwrap_or(DEFAULT_NAV_FILTER);

        params
    }

    /// Write the current values back to the store
    pub fn save_to(&self, store: &mut ParameterStore) -> Result<(), ParameterError> {
        for (name, gps_type) in TYPE_PARAM_NAMES.iter().zip(self.gps_type) {
            store.set(name, ParamValue::Int(gps_type as i32))?;
        }
        store.set(NAVFILTER_PARAM_NAME, ParamValue::Int(self.nav_filter as i32))
    }

    /// Whether any instance is enabled
    pub fn is_valid(&self) -> bool {
        self.gps_type.iter().any(|t| *t != GpsType::None)
    }
}
