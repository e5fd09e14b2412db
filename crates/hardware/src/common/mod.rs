//! Common types shared by every layer of the SoC model.
//!
//! This module provides the small vocabulary the composition engine is built from:
//! 1. **Access sizes:** Width of a memory-mapped access (byte through doubleword).
//! 2. **Values:** The typed value carried by a configuration setting.
//! 3. **Errors:** Mapping, wiring, configuration, activation, and assembly errors.

/// Memory access width definitions.
pub mod data;

/// Error types for mapping, wiring, configuration, and assembly.
pub mod error;

/// Typed configuration values.
pub mod value;

pub use data::AccessSize;
pub use error::{
    ActivationError, AssemblyError, ConfigError, ErrorKind, IrqError, LineSide, MapError, Unmapped,
};
pub use value::Value;
