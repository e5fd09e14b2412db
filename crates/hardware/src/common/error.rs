//! Error definitions for the composition engine.
//!
//! This module defines every failure the assembly path can report. It provides:
//! 1. **Layer errors:** `MapError` (address space), `IrqError` (interrupt fabric),
//!    `ConfigError` (setting application), and `ActivationError` (component-reported).
//! 2. **Assembly errors:** `AssemblyError`, which tags a layer error with the name of
//!    the component that was being brought up when it occurred.
//! 3. **Runtime conditions:** `Unmapped`, produced by address resolution and answered
//!    by the catch-all handler rather than propagated.

use thiserror::Error;

use crate::soc::registry::{ActivationState, ComponentId};

/// Address-space mapping failure.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MapError {
    /// The new range overlaps a mapping in the same priority tier.
    #[error(
        "mapping `{name}` [{base:#x}, {end:#x}) overlaps `{existing}` at priority {priority}"
    )]
    OverlapConflict {
        /// Name of the rejected mapping.
        name: String,
        /// Name of the mapping already covering part of the range.
        existing: String,
        /// First address of the rejected range.
        base: u64,
        /// One past the last address of the rejected range.
        end: u64,
        /// Shared priority tier.
        priority: i32,
    },
    /// The mapping has zero size.
    #[error("mapping `{name}` has zero size")]
    EmptyRange {
        /// Name of the rejected mapping.
        name: String,
    },
    /// `base + size` does not fit in the 64-bit address space.
    #[error("mapping `{name}` at {base:#x} with size {size:#x} wraps the address space")]
    AddressOverflow {
        /// Name of the rejected mapping.
        name: String,
        /// Requested base.
        base: u64,
        /// Requested size.
        size: u64,
    },
    /// The range extends past the end of a bounded region.
    #[error("mapping `{name}` ends at {end:#x}, beyond region `{region}` of size {limit:#x}")]
    OutOfBounds {
        /// Name of the rejected mapping.
        name: String,
        /// Name of the containing region.
        region: String,
        /// One past the last address of the rejected range.
        end: u64,
        /// Size of the containing region.
        limit: u64,
    },
    /// No region with the given name exists.
    #[error("no region named `{0}`")]
    NoSuchRegion(String),
    /// A placement names a register window the component does not expose.
    #[error("`{name}` has no register window {window} ({windows} available)")]
    NoSuchWindow {
        /// Component name.
        name: String,
        /// Requested window index.
        window: usize,
        /// Number of windows the component reports.
        windows: usize,
    },
}

/// Runtime access to an address no mapping claims.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("address {addr:#x} is unmapped")]
pub struct Unmapped {
    /// The unowned address.
    pub addr: u64,
}

/// Which end of an interrupt connection is already taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineSide {
    /// The controller input line already has a source.
    Input,
    /// The source output already drives another line.
    Output,
}

/// Interrupt-fabric wiring failure.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum IrqError {
    /// One end of the requested connection is already bound.
    #[error("{side:?} line {line} of component {component} is already bound")]
    LineAlreadyBound {
        /// Controller (for `Input`) or source (for `Output`).
        component: ComponentId,
        /// Index of the bound line.
        line: usize,
        /// Which end collided.
        side: LineSide,
    },
    /// The controller input index is outside the controller's input vector.
    #[error("input line {line} is out of range for controller {controller} with {lines} inputs")]
    LineOutOfRange {
        /// Target controller.
        controller: ComponentId,
        /// Requested input.
        line: usize,
        /// Size of the controller's input vector.
        lines: usize,
    },
    /// The source component has no such output.
    #[error("component {source_id} has no interrupt output {output} ({outputs} available)")]
    NoSuchOutput {
        /// Source component.
        source_id: ComponentId,
        /// Requested output.
        output: usize,
        /// Number of outputs the component reports.
        outputs: usize,
    },
    /// The target never registered interrupt inputs.
    #[error("component {0} is not an interrupt controller")]
    NotAController(ComponentId),
}

/// Failure applying a configuration setting.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The component does not recognise the setting name.
    #[error("unknown setting `{setting}`")]
    UnknownSetting {
        /// Setting name.
        setting: String,
    },
    /// The value has the wrong type or is out of range.
    #[error("invalid value for setting `{setting}`: {reason}")]
    InvalidValue {
        /// Setting name.
        setting: String,
        /// Human-readable explanation.
        reason: String,
    },
    /// The component is no longer accepting settings.
    #[error("component is {state:?}; settings are only accepted before activation")]
    NotConfigurable {
        /// State the component was in.
        state: ActivationState,
    },
    /// A bus slave was attached at an address already in use on that bus.
    #[error("address {address:#04x} already in use on bus {bus}")]
    AddressInUse {
        /// Bus index.
        bus: usize,
        /// Slave address.
        address: u8,
    },
    /// A bus slave named a bus index the controller does not have.
    #[error("bus {bus} does not exist ({buses} available)")]
    NoSuchBus {
        /// Requested bus index.
        bus: usize,
        /// Bus count of the controller.
        buses: usize,
    },
    /// The parent component does not own any buses.
    #[error("component does not provide buses")]
    NotABus,
}

impl ConfigError {
    /// Shorthand for `ConfigError::UnknownSetting`.
    pub fn unknown(setting: &str) -> Self {
        Self::UnknownSetting { setting: setting.to_owned() }
    }

    /// Shorthand for `ConfigError::InvalidValue`.
    pub fn invalid(setting: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue { setting: setting.to_owned(), reason: reason.into() }
    }
}

/// Component-reported activation failure.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct ActivationError {
    /// Opaque reason supplied by the component.
    pub reason: String,
}

impl ActivationError {
    /// Creates an activation error with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// Coarse classification of an [`AssemblyError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A setting could not be applied.
    Config,
    /// The component rejected activation.
    Activation,
    /// A register window could not be mapped.
    Map,
    /// An interrupt route could not be connected.
    Wiring,
    /// A dependency was not active when the component was sequenced.
    OutOfOrder,
    /// Two components share a name.
    DuplicateName,
    /// A route or parent names a component that was never declared.
    UnknownComponent,
    /// A model name has no registered constructor.
    UnknownModel,
}

/// Failure of a machine assembly, tagged with the responsible component.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AssemblyError {
    /// Applying a setting failed.
    #[error("configuring `{component}`: {source}")]
    Config {
        /// Failing component.
        component: String,
        /// Underlying error.
        #[source]
        source: ConfigError,
    },
    /// The component's activation failed.
    #[error("activating `{component}`: {source}")]
    Activation {
        /// Failing component.
        component: String,
        /// Underlying error.
        #[source]
        source: ActivationError,
    },
    /// Mapping a register window or memory region failed.
    #[error("mapping `{component}`: {source}")]
    Map {
        /// Failing component.
        component: String,
        /// Underlying error.
        #[source]
        source: MapError,
    },
    /// Connecting an interrupt route failed.
    #[error("wiring `{component}`: {source}")]
    Wiring {
        /// Failing component.
        component: String,
        /// Underlying error.
        #[source]
        source: IrqError,
    },
    /// A dependency was not active when the component was reached.
    #[error("`{component}` depends on `{dependency}`, which is {state:?}")]
    OutOfOrder {
        /// Component being sequenced.
        component: String,
        /// Controller or bus parent it depends on.
        dependency: String,
        /// The dependency's state at that point.
        state: ActivationState,
    },
    /// A component name was declared twice.
    #[error("component name `{component}` is already registered")]
    DuplicateName {
        /// Duplicated name.
        component: String,
    },
    /// A route or bus parent refers to an undeclared component.
    #[error("`{component}` refers to undeclared component `{missing}`")]
    UnknownComponent {
        /// Component holding the reference.
        component: String,
        /// Name that did not resolve.
        missing: String,
    },
    /// A model name has no registered constructor.
    #[error("`{component}` requests unknown model `{model}`")]
    UnknownModel {
        /// Component that asked for the model.
        component: String,
        /// Requested model name.
        model: String,
    },
}

impl AssemblyError {
    /// Returns the name of the component responsible for the failure.
    pub fn component(&self) -> &str {
        match self {
            Self::Config { component, .. }
            | Self::Activation { component, .. }
            | Self::Map { component, .. }
            | Self::Wiring { component, .. }
            | Self::OutOfOrder { component, .. }
            | Self::DuplicateName { component }
            | Self::UnknownComponent { component, .. }
            | Self::UnknownModel { component, .. } => component,
        }
    }

    /// Returns the error class.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. } => ErrorKind::Config,
            Self::Activation { .. } => ErrorKind::Activation,
            Self::Map { .. } => ErrorKind::Map,
            Self::Wiring { .. } => ErrorKind::Wiring,
            Self::OutOfOrder { .. } => ErrorKind::OutOfOrder,
            Self::DuplicateName { .. } => ErrorKind::DuplicateName,
            Self::UnknownComponent { .. } => ErrorKind::UnknownComponent,
            Self::UnknownModel { .. } => ErrorKind::UnknownModel,
        }
    }
}
