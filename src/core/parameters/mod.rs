//! Parameter management types
//!
//! Parameter store plus the GPS parameter block. Flash persistence is handled
//! by the board support code.

pub mod error;
pub mod gps;
pub mod storage;

pub use error::ParameterError;
pub use gps::{GpsParams, GpsType, NavFilter};
pub use storage::{ParamFlags, ParamMetadata, ParamValue, ParameterStore, MAX_PARAMS, PARAM_NAME_LEN};
