//! Component registry.
//!
//! The registry owns every component instance for the lifetime of the machine. It provides:
//! 1. **Identity:** Dense `ComponentId`s plus unique names for lookup and error reports.
//! 2. **Lifecycle state:** The `Constructed → Configuring → Active | Failed` state machine,
//!    enforced on every setting and activation request.
//! 3. **Topology:** The bus parent each component was attached under.
//! 4. **Access:** Per-component locks; lookups never lock anything but the target.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::common::{ActivationError, ConfigError, Value};
use crate::soc::traits::Component;

/// Dense handle to a registered component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub usize);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Activation state of a component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActivationState {
    /// Allocated; no settings applied yet.
    Constructed,
    /// At least one setting applied; not yet activated.
    Configuring,
    /// Activation succeeded; the component is mapped and wired.
    Active,
    /// A setting or activation failed; the component is inert.
    Failed,
}

impl ActivationState {
    /// Returns whether settings may still be applied in this state.
    pub const fn accepts_settings(self) -> bool {
        matches!(self, Self::Constructed | Self::Configuring)
    }
}

/// Position of a component on its parent's bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusAttachment {
    /// Bus controller owning the bus.
    pub controller: ComponentId,
    /// Bus index within the controller.
    pub bus: usize,
    /// Slave address on that bus.
    pub address: u8,
}

struct Slot {
    name: String,
    kind: &'static str,
    state: ActivationState,
    parent: Option<BusAttachment>,
    component: Mutex<Box<dyn Component>>,
}

/// Owner of every component instance and its lifecycle state.
#[derive(Default)]
pub struct ComponentRegistry {
    slots: Vec<Slot>,
    by_name: HashMap<String, ComponentId>,
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.slots.iter().map(|s| (&s.name, s.kind, s.state)))
            .finish()
    }
}

impl ComponentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly constructed component under a unique name.
    ///
    /// # Returns
    ///
    /// The new component's id, or `None` if the name is already taken (in which case the
    /// component is dropped and the registry is unchanged).
    pub fn insert(
        &mut self,
        name: &str,
        component: Box<dyn Component>,
        parent: Option<BusAttachment>,
    ) -> Option<ComponentId> {
        if self.by_name.contains_key(name) {
            return None;
        }
        let id = ComponentId(self.slots.len());
        self.slots.push(Slot {
            name: name.to_owned(),
            kind: component.kind(),
            state: ActivationState::Constructed,
            parent,
            component: Mutex::new(component),
        });
        let _ = self.by_name.insert(name.to_owned(), id);
        Some(id)
    }

    /// Returns the number of registered components.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns whether no component is registered.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Looks up a component id by name.
    pub fn id(&self, name: &str) -> Option<ComponentId> {
        self.by_name.get(name).copied()
    }

    /// Returns the name of a component.
    pub fn name(&self, id: ComponentId) -> Option<&str> {
        self.slots.get(id.0).map(|s| s.name.as_str())
    }

    /// Returns the model name of a component.
    pub fn kind(&self, id: ComponentId) -> Option<&'static str> {
        self.slots.get(id.0).map(|s| s.kind)
    }

    /// Returns the activation state of a component.
    pub fn state(&self, id: ComponentId) -> Option<ActivationState> {
        self.slots.get(id.0).map(|s| s.state)
    }

    /// Returns the bus attachment a component was constructed under.
    pub fn parent(&self, id: ComponentId) -> Option<BusAttachment> {
        self.slots.get(id.0).and_then(|s| s.parent)
    }

    /// Iterates over `(id, name, state)` in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (ComponentId, &str, ActivationState)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, s)| (ComponentId(i), s.name.as_str(), s.state))
    }

    /// Applies one setting, enforcing the lifecycle rule.
    ///
    /// The component moves to `Configuring` on the first accepted setting. A rejected
    /// setting leaves the state untouched; the sequencer decides whether to fail it.
    ///
    /// # Errors
    ///
    /// `ConfigError::NotConfigurable` once the component is Active or Failed, otherwise
    /// whatever the component's `set_config` reports.
    pub fn apply_setting(&mut self, id: ComponentId, name: &str, value: &Value) -> Result<(), ConfigError> {
        let slot = self.slot_mut(id)?;
        if !slot.state.accepts_settings() {
            return Err(ConfigError::NotConfigurable { state: slot.state });
        }
        get_mut(&mut slot.component).set_config(name, value)?;
        slot.state = ActivationState::Configuring;
        Ok(())
    }

    /// Activates a component exactly once.
    ///
    /// # Errors
    ///
    /// Returns an `ActivationError` if the component was already activated or failed, or
    /// if the component itself rejects activation. In the latter case the component is
    /// marked `Failed`.
    pub fn activate(&mut self, id: ComponentId) -> Result<(), ActivationError> {
        let slot = self
            .slots
            .get_mut(id.0)
            .ok_or_else(|| ActivationError::new(format!("component {id} is not registered")))?;
        if !slot.state.accepts_settings() {
            return Err(ActivationError::new(format!(
                "`{}` cannot be activated from state {:?}",
                slot.name, slot.state
            )));
        }
        match get_mut(&mut slot.component).activate() {
            Ok(()) => {
                slot.state = ActivationState::Active;
                Ok(())
            }
            Err(e) => {
                slot.state = ActivationState::Failed;
                Err(e)
            }
        }
    }

    /// Marks a component as failed.
    pub fn mark_failed(&mut self, id: ComponentId) {
        if let Some(slot) = self.slots.get_mut(id.0) {
            slot.state = ActivationState::Failed;
        }
    }

    /// Gives exclusive access to a component during assembly (no locking).
    pub fn component_mut(&mut self, id: ComponentId) -> Option<&mut (dyn Component + 'static)> {
        self.slots
            .get_mut(id.0)
            .map(|s| get_mut(&mut s.component).as_mut())
    }

    /// Locks a component for runtime access.
    ///
    /// A lock poisoned by a panicking holder is recovered; the component state is still
    /// the best information available.
    pub fn lock(&self, id: ComponentId) -> Option<MutexGuard<'_, Box<dyn Component>>> {
        self.slots
            .get(id.0)
            .map(|s| s.component.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn slot_mut(&mut self, id: ComponentId) -> Result<&mut Slot, ConfigError> {
        self.slots
            .get_mut(id.0)
            .ok_or(ConfigError::NotConfigurable { state: ActivationState::Failed })
    }
}

fn get_mut(m: &mut Mutex<Box<dyn Component>>) -> &mut Box<dyn Component> {
    m.get_mut().unwrap_or_else(PoisonError::into_inner)
}
