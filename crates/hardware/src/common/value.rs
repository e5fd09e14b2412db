//! Typed configuration values.
//!
//! Components receive their settings as a name plus a `Value`. The accessor helpers
//! convert a value into the type a component expects and produce the matching
//! `ConfigError::InvalidValue` when the types disagree.

use std::fmt;

use super::error::ConfigError;

/// Value carried by a configuration setting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    /// Boolean flag.
    Bool(bool),
    /// Unsigned integer (masks, register reset values, addresses).
    Uint(u64),
    /// Signed integer (thresholds such as temperatures in millidegrees).
    Int(i64),
    /// String (model names, MAC addresses).
    Str(String),
}

impl Value {
    /// Interprets the value as an unsigned integer.
    ///
    /// Non-negative `Int` values are accepted as well.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming `setting` if the value is not a
    /// non-negative integer.
    pub fn as_u64(&self, setting: &str) -> Result<u64, ConfigError> {
        match *self {
            Self::Uint(v) => Ok(v),
            Self::Int(v) if v >= 0 => Ok(v as u64),
            _ => Err(ConfigError::invalid(setting, format!("expected unsigned integer, got {self}"))),
        }
    }

    /// Interprets the value as an unsigned integer that fits in 32 bits.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the value is not an integer or exceeds `u32::MAX`.
    pub fn as_u32(&self, setting: &str) -> Result<u32, ConfigError> {
        let v = self.as_u64(setting)?;
        u32::try_from(v).map_err(|_| ConfigError::invalid(setting, format!("{v:#x} exceeds 32 bits")))
    }

    /// Interprets the value as a signed integer.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the value is not an integer or does not fit `i64`.
    pub fn as_i64(&self, setting: &str) -> Result<i64, ConfigError> {
        match *self {
            Self::Int(v) => Ok(v),
            Self::Uint(v) => i64::try_from(v)
                .map_err(|_| ConfigError::invalid(setting, format!("{v} exceeds i64"))),
            _ => Err(ConfigError::invalid(setting, format!("expected integer, got {self}"))),
        }
    }

    /// Interprets the value as a boolean.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the value is not a `Bool`.
    pub fn as_bool(&self, setting: &str) -> Result<bool, ConfigError> {
        match *self {
            Self::Bool(v) => Ok(v),
            _ => Err(ConfigError::invalid(setting, format!("expected boolean, got {self}"))),
        }
    }

    /// Interprets the value as a string slice.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the value is not a `Str`.
    pub fn as_str(&self, setting: &str) -> Result<&str, ConfigError> {
        match self {
            Self::Str(s) => Ok(s),
            _ => Err(ConfigError::invalid(setting, format!("expected string, got {self}"))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v:#x}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Uint(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Uint(u64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}
