//! Component capability contract.
//!
//! This module defines the `Component` trait implemented by every unit the assembler
//! composes into a machine. It provides:
//! 1. **Identification:** `kind` names the model for logs and topology dumps.
//! 2. **Lifecycle:** Typed `set_config` before a single `activate` call.
//! 3. **Topology:** Register windows for the address space, interrupt outputs and inputs
//!    for the interrupt fabric, and child attachment for bus controllers.
//! 4. **Access:** Component-relative `read`/`write` plus an optional `tick`.
//! 5. **Downcasting:** `as_any`/`as_any_mut` for typed access to a concrete model.
//!
//! All implementors must be `Send` so the assembled machine can be shared across threads;
//! the registry wraps each component in its own lock.

use std::any::Any;
use std::sync::Arc;

use crate::common::{AccessSize, ActivationError, ConfigError, Value};
use crate::soc::interrupt::{IrqInputBank, IrqLine};
use crate::soc::registry::ComponentId;

/// A memory-mapped register window exposed by a component.
///
/// `offset` is relative to the component; the caller chooses where the window lands in
/// the address space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterWindow {
    /// Offset of the window within the component.
    pub offset: u64,
    /// Window size in bytes.
    pub size: u64,
}

impl RegisterWindow {
    /// Creates a window starting at component offset 0.
    pub const fn new(size: u64) -> Self {
        Self { offset: 0, size }
    }

    /// Creates a window starting at the given component offset.
    pub const fn at(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }
}

/// Trait for every hardware unit the machine assembler can compose.
///
/// Only `kind`, `as_any` and `as_any_mut` are required; every other capability has an
/// inert default so simple models stay short.
pub trait Component: Send + Any {
    /// Returns the model name of this component (e.g., `"aspeed.vic"`).
    fn kind(&self) -> &'static str;

    /// Applies one typed setting.
    ///
    /// Called only while the component is Constructed or Configuring.
    ///
    /// # Errors
    ///
    /// `ConfigError::UnknownSetting` for names the model does not know, and
    /// `ConfigError::InvalidValue` for values of the wrong type or range.
    fn set_config(&mut self, name: &str, _value: &Value) -> Result<(), ConfigError> {
        Err(ConfigError::unknown(name))
    }

    /// Performs resource acquisition and validation; called exactly once.
    ///
    /// # Errors
    ///
    /// Returns the component's reason when its configuration cannot be realised.
    fn activate(&mut self) -> Result<(), ActivationError> {
        Ok(())
    }

    /// Returns the register windows to be installed in the address space.
    fn register_windows(&self) -> Vec<RegisterWindow> {
        Vec::new()
    }

    /// Returns the number of interrupt output lines this component drives.
    fn interrupt_outputs(&self) -> usize {
        0
    }

    /// Returns the size of this component's interrupt input vector (0 for non-controllers).
    fn interrupt_inputs(&self) -> usize {
        0
    }

    /// Receives the input bank the fabric allocated for this controller.
    fn attach_inputs(&mut self, _bank: Arc<IrqInputBank>) {}

    /// Receives the fabric line bound to one of this component's outputs.
    fn connect_output(&mut self, _output: usize, _line: IrqLine) {}

    /// Returns the number of child buses this component provides.
    fn bus_count(&self) -> usize {
        0
    }

    /// Attaches an active child device to one of this component's buses.
    ///
    /// # Errors
    ///
    /// `ConfigError::NotABus` if the component has no buses, `ConfigError::NoSuchBus`
    /// for a bad index, and `ConfigError::AddressInUse` for an address collision.
    fn attach_child(&mut self, _bus: usize, _address: u8, _child: ComponentId) -> Result<(), ConfigError> {
        Err(ConfigError::NotABus)
    }

    /// Reads from a component-relative offset.
    fn read(&mut self, _offset: u64, _size: AccessSize) -> u64 {
        0
    }

    /// Writes to a component-relative offset.
    fn write(&mut self, _offset: u64, _value: u64, _size: AccessSize) {}

    /// Advances the component by one step (e.g., timer counting).
    fn tick(&mut self) {}

    /// Returns `self` as `Any` for typed inspection.
    fn as_any(&self) -> &dyn Any;

    /// Returns `self` as mutable `Any` for typed access.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
