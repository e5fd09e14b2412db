//! System-on-Chip (SoC) composition.
//!
//! This module organizes the engine that assembles a machine from components,
//! including the address space, interrupt fabric, component registry, activation
//! sequencer, and the AST2400 board description built on top of them.

/// Hierarchical, prioritised address space.
pub mod address_space;

/// AST2400 component names, interrupt numbers and blueprint.
pub mod ast2400;

/// Host-side character and network backends.
pub mod backend;

/// Blueprint and assembled `Machine`.
pub mod builder;

/// Peripheral models.
pub mod devices;

/// Interrupt lines, controller input banks and the wiring fabric.
pub mod interrupt;

/// On-chip RAM.
pub mod memory;

/// Component registry and activation states.
pub mod registry;

/// Ordered, lazily constructed component steps.
pub mod sequencer;

/// Component trait definitions.
pub mod traits;

pub use address_space::{AddressSpace, MapEntry, Resolution};
pub use backend::{BufferBackend, CharBackend, HostBackends, NicBackend, StdioBackend};
pub use builder::{Blueprint, Machine, RegionSpec};
pub use interrupt::{InterruptFabric, IrqInputBank, IrqLine};
pub use registry::{ActivationState, BusAttachment, ComponentId, ComponentRegistry};
pub use sequencer::{ActivationSequencer, ComponentStep};
pub use traits::{Component, RegisterWindow};
