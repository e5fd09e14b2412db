//! AST2400 BMC SoC composition library.
//!
//! This crate assembles a simulated BMC system-on-chip from independent components:
//! 1. **Address space:** Prioritised, nested mapping of address ranges to components.
//! 2. **Interrupts:** Lines from component outputs to controller input banks.
//! 3. **Registry:** Named components with a create, configure, activate lifecycle.
//! 4. **Sequencing:** Ordered, lazily constructed steps that stop at the first failure.
//! 5. **AST2400:** Peripheral models and the board blueprint built on the engine.

/// Common types (access sizes, setting values, errors).
pub mod common;
/// Machine configuration (base addresses and static component settings).
pub mod config;
/// System-on-chip (address space, fabric, registry, sequencer, devices, assembly).
pub mod soc;

/// Root configuration type; use `MachineConfig::default()` or deserialize from JSON.
pub use crate::config::MachineConfig;
/// First error raised during assembly.
pub use crate::common::AssemblyError;
/// Assembled machine; construct with `Machine::assemble`.
pub use crate::soc::{HostBackends, Machine};
