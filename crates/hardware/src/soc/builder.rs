//! Machine assembly and the top-level `Machine` type.
//!
//! This module turns a `Blueprint` into a wired machine. It performs:
//! 1. **Region setup:** Installs backing RAM and I/O regions (each I/O region backed by
//!    a catch-all device) at their fixed bases.
//! 2. **Sequencing:** Runs the blueprint's component steps through the activation
//!    sequencer, installing each component as soon as it is active.
//! 3. **Installation:** Registers controller input vectors, maps register windows and
//!    connects interrupt routes.
//! 4. **Runtime access:** Routes reads, writes and ticks through the frozen topology.

use std::fmt;

use tracing::{debug, info, warn};

use crate::common::{AccessSize, ActivationError, AssemblyError, IrqError, MapError, Unmapped};
use crate::config::MachineConfig;
use crate::soc::address_space::{AddressSpace, MapEntry, Resolution};
use crate::soc::backend::HostBackends;
use crate::soc::devices::CatchAll;
use crate::soc::interrupt::{Connection, InterruptFabric};
use crate::soc::memory::Sram;
use crate::soc::registry::{ActivationState, ComponentId, ComponentRegistry};
use crate::soc::sequencer::{ActivationSequencer, ComponentStep, Placement};
use crate::soc::traits::Component;

/// Backing region installed before any component step runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegionSpec {
    /// Zero-filled RAM.
    Ram {
        /// Region and component name.
        name: String,
        /// Base address.
        base: u64,
        /// Size in bytes.
        size: u64,
        /// Priority tier.
        priority: i32,
    },
    /// Nested I/O region whose unclaimed offsets go to a catch-all device.
    Io {
        /// Region and catch-all component name.
        name: String,
        /// Base address.
        base: u64,
        /// Size in bytes.
        size: u64,
        /// Priority tier.
        priority: i32,
    },
}

/// Declarative description of a machine: backing regions plus ordered component steps.
#[derive(Debug)]
pub struct Blueprint {
    name: String,
    regions: Vec<RegionSpec>,
    sequence: ActivationSequencer,
}

impl Blueprint {
    /// Creates an empty blueprint; `name` labels the root address space.
    pub fn new(name: &str) -> Self {
        Self { name: name.to_owned(), regions: Vec::new(), sequence: ActivationSequencer::new() }
    }

    /// Adds a RAM region.
    #[must_use]
    pub fn ram(mut self, name: &str, base: u64, size: u64, priority: i32) -> Self {
        self.regions.push(RegionSpec::Ram { name: name.to_owned(), base, size, priority });
        self
    }

    /// Adds an I/O region backed by a catch-all device.
    #[must_use]
    pub fn io(mut self, name: &str, base: u64, size: u64, priority: i32) -> Self {
        self.regions.push(RegionSpec::Io { name: name.to_owned(), base, size, priority });
        self
    }

    /// Appends a component step.
    #[must_use]
    pub fn step(mut self, step: ComponentStep) -> Self {
        self.sequence.push(step);
        self
    }

    /// Appends a component step in place.
    pub fn push(&mut self, step: ComponentStep) {
        self.sequence.push(step);
    }

    /// Returns the declared component names in activation order.
    pub fn component_names(&self) -> Vec<&str> {
        self.sequence.names().collect()
    }
}

/// Fully assembled machine.
///
/// Topology is frozen: the machine only hands out shared references to its address
/// space, fabric and registry, so nothing can be remapped or rewired after assembly.
pub struct Machine {
    name: String,
    registry: ComponentRegistry,
    space: AddressSpace,
    fabric: InterruptFabric,
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("name", &self.name)
            .field("components", &self.registry.len())
            .field("mappings", &self.space.mappings().len())
            .field("connections", &self.fabric.connections().len())
            .finish()
    }
}

impl Machine {
    /// Assembles the AST2400 SoC from configuration and host backends.
    ///
    /// # Errors
    ///
    /// Returns the first `AssemblyError`; see [`crate::soc::ast2400::assemble`].
    pub fn assemble(config: &MachineConfig, backends: HostBackends) -> Result<Self, AssemblyError> {
        crate::soc::ast2400::assemble(&config.bases, &config.soc, backends)
    }

    /// Builds a machine from a blueprint.
    ///
    /// Regions are installed first, then every step is sequenced in order. Nothing is
    /// constructed after the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first `AssemblyError`, naming the failing component.
    pub fn from_blueprint(blueprint: Blueprint) -> Result<Self, AssemblyError> {
        let Blueprint { name, regions, sequence } = blueprint;
        let mut registry = ComponentRegistry::new();
        let mut space = AddressSpace::new(&name);
        let mut fabric = InterruptFabric::new();

        for region in regions {
            install_region(&mut registry, &mut space, region)?;
        }

        sequence.run(&mut registry, |registry, id, placement| {
            install(registry, &mut space, &mut fabric, id, placement)
        })?;

        info!(
            machine = %name,
            components = registry.len(),
            mappings = space.mappings().len(),
            connections = fabric.connections().len(),
            "machine assembled"
        );
        Ok(Self { name, registry, space, fabric })
    }

    /// Returns the machine name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the frozen address space.
    pub const fn address_space(&self) -> &AddressSpace {
        &self.space
    }

    /// Returns the frozen interrupt fabric.
    pub const fn fabric(&self) -> &InterruptFabric {
        &self.fabric
    }

    /// Returns the component registry.
    pub const fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Returns the flattened memory map.
    pub fn memory_map(&self) -> Vec<MapEntry> {
        self.space.entries()
    }

    /// Returns the interrupt connections in wiring order.
    pub fn connections(&self) -> &[Connection] {
        self.fabric.connections()
    }

    /// Resolves an address to its owning component.
    ///
    /// # Errors
    ///
    /// Returns `Unmapped` if nothing claims the address.
    pub fn resolve(&self, addr: u64) -> Result<Resolution, Unmapped> {
        self.space.resolve(addr)
    }

    /// Looks up a component by name.
    pub fn component_id(&self, name: &str) -> Option<ComponentId> {
        self.registry.id(name)
    }

    /// Returns whether a component with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.registry.id(name).is_some()
    }

    /// Returns the activation state of a named component.
    pub fn state(&self, name: &str) -> Option<ActivationState> {
        self.registry.id(name).and_then(|id| self.registry.state(id))
    }

    /// Reads from a physical address.
    ///
    /// Unmapped addresses are logged and read as zero.
    pub fn read(&self, addr: u64, size: AccessSize) -> u64 {
        match self.space.resolve(addr) {
            Ok(hit) => self
                .registry
                .lock(hit.component)
                .map_or(0, |mut c| c.read(hit.offset, size)),
            Err(Unmapped { addr }) => {
                warn!(target: "unimp", "{}: unmapped read at {:#x} (size {})", self.name, addr, size);
                0
            }
        }
    }

    /// Writes to a physical address.
    ///
    /// Writes to unmapped addresses are logged and dropped.
    pub fn write(&self, addr: u64, value: u64, size: AccessSize) {
        match self.space.resolve(addr) {
            Ok(hit) => {
                if let Some(mut c) = self.registry.lock(hit.component) {
                    c.write(hit.offset, value, size);
                }
            }
            Err(Unmapped { addr }) => {
                warn!(
                    target: "unimp",
                    "{}: unmapped write at {:#x} (size {}, value {:#x})", self.name, addr, size, value
                );
            }
        }
    }

    /// Advances every active component by one step, in registration order.
    pub fn tick(&self) {
        for (id, _, state) in self.registry.iter() {
            if state != ActivationState::Active {
                continue;
            }
            if let Some(mut c) = self.registry.lock(id) {
                c.tick();
            }
        }
    }

    /// Runs `f` on a named component downcast to its concrete type.
    ///
    /// # Returns
    ///
    /// `None` if no component has that name or it is not a `T`.
    pub fn with_component<T, R>(&self, name: &str, f: impl FnOnce(&mut T) -> R) -> Option<R>
    where
        T: Component,
    {
        let id = self.registry.id(name)?;
        let mut guard = self.registry.lock(id)?;
        guard.as_any_mut().downcast_mut::<T>().map(f)
    }
}

fn install_region(
    registry: &mut ComponentRegistry,
    space: &mut AddressSpace,
    region: RegionSpec,
) -> Result<(), AssemblyError> {
    let (name, base, size, mapped) = match region {
        RegionSpec::Ram { name, base, size, priority } => {
            let _ = space
                .check_range(&name, base, size, priority)
                .map_err(|source| AssemblyError::Map { component: name.clone(), source })?;
            let ram = usize::try_from(size)
                .ok()
                .and_then(|bytes| Sram::try_new(bytes).ok())
                .ok_or_else(|| AssemblyError::Activation {
                    component: name.clone(),
                    source: ActivationError::new(format!("cannot allocate {size:#x} bytes of RAM")),
                })?;
            let id = register_backing(registry, &name, Box::new(ram))?;
            let mapped = space.map(&name, base, size, id, priority).map_err(|e| (id, e));
            (name, base, size, mapped)
        }
        RegionSpec::Io { name, base, size, priority } => {
            let id = register_backing(registry, &name, Box::new(CatchAll::new(&name)))?;
            let region = AddressSpace::region(&name, size, Some(id));
            let mapped = space.map_region(base, region, priority).map_err(|e| (id, e));
            (name, base, size, mapped)
        }
    };
    if let Err((id, source)) = mapped {
        registry.mark_failed(id);
        return Err(AssemblyError::Map { component: name, source });
    }
    debug!(region = %name, base, size, "region installed");
    Ok(())
}

fn register_backing(
    registry: &mut ComponentRegistry,
    name: &str,
    device: Box<dyn Component>,
) -> Result<ComponentId, AssemblyError> {
    let id = registry
        .insert(name, device, None)
        .ok_or_else(|| AssemblyError::DuplicateName { component: name.to_owned() })?;
    registry
        .activate(id)
        .map_err(|source| AssemblyError::Activation { component: name.to_owned(), source })?;
    Ok(id)
}

/// Installs a freshly activated component: input vector, register windows, then
/// interrupt routes.
fn install(
    registry: &mut ComponentRegistry,
    space: &mut AddressSpace,
    fabric: &mut InterruptFabric,
    id: ComponentId,
    placement: &Placement,
) -> Result<(), AssemblyError> {
    let name = registry.name(id).unwrap_or_default().to_owned();
    let Some(component) = registry.component_mut(id) else {
        return Err(AssemblyError::UnknownComponent { component: name.clone(), missing: name });
    };

    let inputs = component.interrupt_inputs();
    if inputs > 0 {
        component.attach_inputs(fabric.add_controller(id, inputs));
    }
    let windows = component.register_windows();
    let outputs = component.interrupt_outputs();

    for w in &placement.windows {
        let window = windows.get(w.window).copied().ok_or_else(|| AssemblyError::Map {
            component: name.clone(),
            source: MapError::NoSuchWindow { name: name.clone(), window: w.window, windows: windows.len() },
        })?;
        let label = if w.window == 0 { name.clone() } else { format!("{name}.{}", w.window) };
        let target = match &w.region {
            None => &mut *space,
            Some(region) => space.region_mut(region).ok_or_else(|| AssemblyError::Map {
                component: name.clone(),
                source: MapError::NoSuchRegion(region.clone()),
            })?,
        };
        target
            .map_window(&label, w.base, window, id, w.priority)
            .map_err(|source| AssemblyError::Map { component: name.clone(), source })?;
    }

    for route in &placement.irqs {
        if route.output >= outputs {
            return Err(AssemblyError::Wiring {
                component: name,
                source: IrqError::NoSuchOutput { source_id: id, output: route.output, outputs },
            });
        }
        let controller = registry.id(&route.controller).ok_or_else(|| AssemblyError::UnknownComponent {
            component: name.clone(),
            missing: route.controller.clone(),
        })?;
        match registry.state(controller) {
            Some(ActivationState::Active) => {}
            state => {
                return Err(AssemblyError::OutOfOrder {
                    component: name,
                    dependency: route.controller.clone(),
                    state: state.unwrap_or(ActivationState::Failed),
                });
            }
        }
        let line = fabric
            .connect(id, route.output, controller, route.input)
            .map_err(|source| AssemblyError::Wiring { component: name.clone(), source })?;
        if let Some(component) = registry.component_mut(id) {
            component.connect_output(route.output, line);
        }
    }
    Ok(())
}
