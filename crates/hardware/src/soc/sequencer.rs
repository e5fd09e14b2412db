//! Activation sequencer.
//!
//! The sequencer brings components up one at a time in the declared order. It provides:
//! 1. **Steps:** `ComponentStep` bundles a constructor, the bus parent, the settings and
//!    the placement (register windows and interrupt routes) of one component.
//! 2. **Lifecycle:** Each step is constructed, configured, activated and then handed to the
//!    caller's install hook, strictly in that order.
//! 3. **Abort on first failure:** The first failing step marks its component `Failed` and
//!    ends the run; later steps are never constructed.

use tracing::{error, info};

use crate::common::{AssemblyError, Value};
use crate::soc::registry::{ActivationState, BusAttachment, ComponentId, ComponentRegistry};
use crate::soc::traits::Component;

/// Deferred construction of one component.
pub type Constructor = Box<dyn FnOnce() -> Box<dyn Component>>;

/// Where one register window of a component lands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowPlacement {
    /// Index into the component's `register_windows()`.
    pub window: usize,
    /// Base address, relative to `region` if one is named.
    pub base: u64,
    /// Nested region to map into; `None` for the root space.
    pub region: Option<String>,
    /// Priority tier.
    pub priority: i32,
}

/// One interrupt output of a component and the controller input it drives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IrqRoute {
    /// Output index on the component being sequenced.
    pub output: usize,
    /// Name of the controller.
    pub controller: String,
    /// Input index on the controller.
    pub input: usize,
}

/// Bus position requested for a component, by controller name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusParent {
    /// Name of the bus controller.
    pub controller: String,
    /// Bus index within the controller.
    pub bus: usize,
    /// Slave address.
    pub address: u8,
}

/// Mapping and wiring applied after a component activates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Placement {
    /// Register windows to map.
    pub windows: Vec<WindowPlacement>,
    /// Interrupt outputs to connect.
    pub irqs: Vec<IrqRoute>,
}

/// Everything needed to bring up one component.
pub struct ComponentStep {
    /// Unique component name.
    pub name: String,
    construct: Constructor,
    /// Bus the component is attached to, if it is a bus slave.
    pub parent: Option<BusParent>,
    /// Settings applied in order before activation.
    pub settings: Vec<(String, Value)>,
    /// Mapping and wiring applied after activation.
    pub placement: Placement,
}

impl std::fmt::Debug for ComponentStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentStep")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("settings", &self.settings)
            .field("placement", &self.placement)
            .finish_non_exhaustive()
    }
}

impl ComponentStep {
    /// Creates a step that constructs its component with `construct`.
    pub fn new(name: &str, construct: impl FnOnce() -> Box<dyn Component> + 'static) -> Self {
        Self {
            name: name.to_owned(),
            construct: Box::new(construct),
            parent: None,
            settings: Vec::new(),
            placement: Placement::default(),
        }
    }

    /// Queues a setting to apply before activation.
    #[must_use]
    pub fn setting(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.settings.push((name.to_owned(), value.into()));
        self
    }

    /// Maps register window `window` at `base` in the root space, priority 0.
    #[must_use]
    pub fn window(mut self, window: usize, base: u64) -> Self {
        self.placement.windows.push(WindowPlacement { window, base, region: None, priority: 0 });
        self
    }

    /// Maps register window `window` at `offset` inside the named region, priority 0.
    #[must_use]
    pub fn window_in(mut self, window: usize, region: &str, offset: u64) -> Self {
        self.placement.windows.push(WindowPlacement {
            window,
            base: offset,
            region: Some(region.to_owned()),
            priority: 0,
        });
        self
    }

    /// Routes interrupt `output` to `input` of the named controller.
    #[must_use]
    pub fn irq(mut self, output: usize, controller: &str, input: usize) -> Self {
        self.placement.irqs.push(IrqRoute { output, controller: controller.to_owned(), input });
        self
    }

    /// Attaches the component to a bus of the named controller.
    #[must_use]
    pub fn on_bus(mut self, controller: &str, bus: usize, address: u8) -> Self {
        self.parent = Some(BusParent { controller: controller.to_owned(), bus, address });
        self
    }
}

/// Runs component steps in declared order and stops at the first failure.
#[derive(Debug, Default)]
pub struct ActivationSequencer {
    steps: Vec<ComponentStep>,
}

impl ActivationSequencer {
    /// Creates an empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step.
    pub fn push(&mut self, step: ComponentStep) {
        self.steps.push(step);
    }

    /// Returns the declared component names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.steps.iter().map(|s| s.name.as_str())
    }

    /// Returns the number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns whether the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every step against `registry`.
    ///
    /// For each step: resolve and check the bus parent, construct, register, apply every
    /// setting, activate, call `install` with the new id and the step's placement, and
    /// finally attach the component to its parent bus.
    ///
    /// # Errors
    ///
    /// Returns the first failure. The failing component (if it was registered) is left
    /// `Failed`, and no later step is constructed.
    pub fn run<F>(self, registry: &mut ComponentRegistry, mut install: F) -> Result<(), AssemblyError>
    where
        F: FnMut(&mut ComponentRegistry, ComponentId, &Placement) -> Result<(), AssemblyError>,
    {
        for step in self.steps {
            let name = step.name.clone();
            if let Err(e) = run_step(registry, step, &mut install) {
                error!(component = %name, error = %e, "assembly aborted");
                return Err(e);
            }
        }
        Ok(())
    }
}

fn run_step<F>(registry: &mut ComponentRegistry, step: ComponentStep, install: &mut F) -> Result<(), AssemblyError>
where
    F: FnMut(&mut ComponentRegistry, ComponentId, &Placement) -> Result<(), AssemblyError>,
{
    let ComponentStep { name, construct, parent, settings, placement } = step;

    let attachment = parent
        .map(|p| resolve_parent(registry, &name, &p))
        .transpose()?;

    let id = registry
        .insert(&name, construct(), attachment)
        .ok_or_else(|| AssemblyError::DuplicateName { component: name.clone() })?;

    for (setting, value) in &settings {
        if let Err(source) = registry.apply_setting(id, setting, value) {
            registry.mark_failed(id);
            return Err(AssemblyError::Config { component: name, source });
        }
    }

    registry
        .activate(id)
        .map_err(|source| AssemblyError::Activation { component: name.clone(), source })?;

    if let Err(e) = install(registry, id, &placement) {
        registry.mark_failed(id);
        return Err(e);
    }

    if let Some(at) = attachment {
        let attached = registry
            .component_mut(at.controller)
            .map(|ctl| ctl.attach_child(at.bus, at.address, id));
        if let Some(Err(source)) = attached {
            registry.mark_failed(id);
            return Err(AssemblyError::Config { component: name, source });
        }
    }

    info!(component = %name, kind = registry.kind(id).unwrap_or_default(), "active");
    Ok(())
}

fn resolve_parent(
    registry: &ComponentRegistry,
    name: &str,
    parent: &BusParent,
) -> Result<BusAttachment, AssemblyError> {
    let controller = registry.id(&parent.controller).ok_or_else(|| AssemblyError::UnknownComponent {
        component: name.to_owned(),
        missing: parent.controller.clone(),
    })?;
    match registry.state(controller) {
        Some(ActivationState::Active) => Ok(BusAttachment {
            controller,
            bus: parent.bus,
            address: parent.address,
        }),
        state => Err(AssemblyError::OutOfOrder {
            component: name.to_owned(),
            dependency: parent.controller.clone(),
            state: state.unwrap_or(ActivationState::Failed),
        }),
    }
}
