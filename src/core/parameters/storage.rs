//! Parameter Storage Types
//!
//! Provides the parameter value types and the `ParameterStore` that GPS
//! configuration is read from. Flash persistence lives with the board code.

use super::error::ParameterError;
use bitflags::bitflags;
use heapless::index_map::FnvIndexMap;
use heapless::String;

/// Maximum parameter name length
pub const PARAM_NAME_LEN: usize = 16;

/// Maximum number of parameters
pub const MAX_PARAMS: usize = 32;

bitflags! {
    /// Parameter flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ParamFlags: u8 {
        /// Parameter is hidden from parameter listings
        const HIDDEN = 0b00000001;
        /// Parameter is read-only (cannot be modified from a GCS)
        const READ_ONLY = 0b00000010;
    }
}

/// Parameter value types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    /// Boolean parameter
    Bool(bool),
    /// 32-bit signed integer
    Int(i32),
    /// 32-bit floating point
    Float(f32),
}

impl ParamValue {
    /// Integer view of the value, truncating floats
    pub fn as_i32(&self) -> i32 {
        match self {
            ParamValue::Bool(b) => *b as i32,
            ParamValue::Int(v) => *v,
            ParamValue::Float(v) => *v as i32,
        }
    }
}

/// Parameter metadata
#[derive(Debug, Clone)]
pub struct ParamMetadata {
    /// Parameter flags
    pub flags: ParamFlags,
}

/// Parameter store for configuration management
///
/// Stores parameters as key-value pairs with metadata (flags).
pub struct ParameterStore {
    parameters: FnvIndexMap<String<PARAM_NAME_LEN>, ParamValue, MAX_PARAMS>,
    metadata: FnvIndexMap<String<PARAM_NAME_LEN>, ParamMetadata, MAX_PARAMS>,
    /// Dirty flag (needs Flash write)
    dirty: bool,
}

fn param_key(name: &str) -> Result<String<PARAM_NAME_LEN>, ParameterError> {
    let mut key = String::<PARAM_NAME_LEN>::new();
    key.push_str(name)
        .map_err(|_| ParameterError::InvalidConfig)?;
    Ok(key)
}

impl ParameterStore {
    /// Create a new empty parameter store
    pub fn new() -> Self {
        Self {
            parameters: FnvIndexMap::new(),
            metadata: FnvIndexMap::new(),
            dirty: false,
        }
    }

    /// Get parameter value
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        let key = param_key(name).ok()?;
        self.parameters.get(&key)
    }

    /// Set parameter value
    ///
    /// Marks the store as dirty (needs Flash write).
    pub fn set(&mut self, name: &str, value: ParamValue) -> Result<(), ParameterError> {
        let key = param_key(name)?;

        if !self.parameters.contains_key(&key) {
            return Err(ParameterError::InvalidConfig);
        }

        if let Some(meta) = self.metadata.get(&key) {
            if meta.flags.contains(ParamFlags::READ_ONLY) {
                return Err(ParameterError::ReadOnly);
            }
        }

        self.parameters.insert(key, value).ok();
        self.dirty = true;
        Ok(())
    }

    /// Register a new parameter with default value and flags
    ///
    /// If the parameter already exists, this is a no-op (idempotent).
    pub fn register(
        &mut self,
        name: &str,
        default_value: ParamValue,
        flags: ParamFlags,
    ) -> Result<(), ParameterError> {
        let key = param_key(name)?;

        if self.parameters.contains_key(&key) {
            return Ok(());
        }

        self.parameters
            .insert(key.clone(), default_value)
            .map_err(|_| ParameterError::StoreFull)?;
        self.metadata
            .insert(key, ParamMetadata { flags })
            .map_err(|_| ParameterError::StoreFull)?;
        self.dirty = true;
        Ok(())
    }

    /// Check if parameter is hidden
    pub fn is_hidden(&self, name: &str) -> bool {
        param_key(name)
            .ok()
            .and_then(|key| self.metadata.get(&key))
            .map(|meta| meta.flags.contains(ParamFlags::HIDDEN))
            .unwrap_or(false)
    }

    /// Get parameter count (excluding hidden parameters)
    pub fn count(&self) -> usize {
        self.parameters
            .keys()
            .filter(|name| !self.is_hidden(name.as_str()))
            .count()
    }

    /// Check if store has unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear dirty flag (called after successful flash save)
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_store_register_and_get() {
        let mut store = ParameterStore::new();
        store
            .register("GPS_TYPE", ParamValue::Int(1), ParamFlags::empty())
            .unwrap();
        assert_eq!(store.get("GPS_TYPE"), Some(&ParamValue::Int(1)));
        assert_eq!(store.get("GPS_TYPE2"), None);
    }

    #[test]
    fn test_parameter_store_set_marks_dirty() {
        let mut store = ParameterStore::new();
        store
            .register("GPS_TYPE", ParamValue::Int(1), ParamFlags::empty())
            .unwrap();
        store.clear_dirty();

        store.set("GPS_TYPE", ParamValue::Int(5)).unwrap();
        assert_eq!(store.get("GPS_TYPE"), Some(&ParamValue::Int(5)));
        assert!(store.is_dirty());
    }

    #[test]
    fn test_parameter_store_set_unknown() {
        let mut store = ParameterStore::new();
        assert_eq!(
            store.set("UNKNOWN", ParamValue::Int(1)),
            Err(ParameterError::InvalidConfig)
        );
    }

    #[test]
    fn test_parameter_store_name_too_long() {
        let mut store = ParameterStore::new();
        let result = store.register(
            "THIS_NAME_IS_FAR_TOO_LONG",
            ParamValue::Int(0),
            ParamFlags::empty(),
        );
        assert_eq!(result, Err(ParameterError::InvalidConfig));
    }

    #[test]
    fn test_parameter_store_register_idempotent() {
        let mut store = ParameterStore::new();
        store
            .register("GPS_TYPE", ParamValue::Int(1), ParamFlags::empty())
            .unwrap();
        store.set("GPS_TYPE", ParamValue::Int(2)).unwrap();
        store
            .register("GPS_TYPE", ParamValue::Int(1), ParamFlags::empty())
            .unwrap();
        assert_eq!(store.get("GPS_TYPE"), Some(&ParamValue::Int(2)));
    }

    #[test]
    fn test_parameter_read_only_and_hidden() {
        let mut store = ParameterStore::new();
        store
            .register("RO", ParamValue::Int(42), ParamFlags::READ_ONLY)
            .unwrap();
        store
            .register("SECRET", ParamValue::Bool(true), ParamFlags::HIDDEN)
            .unwrap();

        assert_eq!(
            store.set("RO", ParamValue::Int(100)),
            Err(ParameterError::ReadOnly)
        );
        assert!(store.is_hidden("SECRET"));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_param_value_as_i32() {
        assert_eq!(ParamValue::Int(6).as_i32(), 6);
        assert_eq!(ParamValue::Float(4.9).as_i32(), 4);
        assert_eq!(ParamValue::Bool(true).as_i32(), 1);
    }
}
