//! Hierarchical address space.
//!
//! This module maps address ranges to components. It provides:
//! 1. **Priority tiers:** Ranges within one tier never overlap; a higher tier shadows the
//!    tiers below it wherever they overlap.
//! 2. **Nested regions:** A mapping can target a child `AddressSpace` whose addresses are
//!    relative to the mapping base, optionally backed by a background component that
//!    answers every offset no child claims.
//! 3. **Resolution:** `resolve` turns an address into `(component, offset)`, where the
//!    offset is relative to the component, not to the mapping.
//!
//! Resolution only reads the table, so a frozen space can be shared across threads
//! without locking. Mutation goes through `&mut self` and therefore ends when the machine
//! takes ownership.

use tracing::debug;

use crate::common::{MapError, Unmapped};
use crate::soc::registry::ComponentId;
use crate::soc::traits::RegisterWindow;

/// What a mapping routes accesses to.
#[derive(Debug)]
pub enum MappingTarget {
    /// A component; the mapping's `offset` is added to the in-range offset.
    Component(ComponentId),
    /// A nested region addressed relative to the mapping base.
    Region(AddressSpace),
}

/// One installed address range.
#[derive(Debug)]
pub struct Mapping {
    /// Descriptive name, used in logs and conflict reports.
    pub name: String,
    /// First address of the range.
    pub base: u64,
    /// Range size in bytes.
    pub size: u64,
    /// Priority tier; higher values shadow lower ones.
    pub priority: i32,
    /// Offset within the target component at which the range starts.
    pub offset: u64,
    /// Routing target.
    pub target: MappingTarget,
}

impl Mapping {
    /// Returns one past the last address of the range.
    #[inline]
    pub const fn end(&self) -> u64 {
        self.base + self.size
    }

    /// Returns whether the range contains `addr`.
    #[inline]
    pub const fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr - self.base < self.size
    }

    const fn overlaps(&self, base: u64, end: u64) -> bool {
        self.base < end && base < self.end()
    }
}

/// Result of resolving an address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// Component that owns the address.
    pub component: ComponentId,
    /// Offset within that component.
    pub offset: u64,
}

/// One row of a flattened memory map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapEntry {
    /// Mapping name.
    pub name: String,
    /// Absolute first address.
    pub base: u64,
    /// Absolute end (exclusive).
    pub end: u64,
    /// Priority tier within the parent space.
    pub priority: i32,
    /// Nesting depth; 0 for the root space.
    pub depth: usize,
    /// Target component, or the background of a region.
    pub component: Option<ComponentId>,
}

/// Ordered, prioritised mapping from address ranges to components.
#[derive(Debug)]
pub struct AddressSpace {
    name: String,
    limit: Option<u64>,
    background: Option<ComponentId>,
    /// Sorted by descending priority, then ascending base.
    mappings: Vec<Mapping>,
}

impl AddressSpace {
    /// Creates an empty, unbounded address space.
    pub fn new(name: &str) -> Self {
        Self { name: name.to_owned(), limit: None, background: None, mappings: Vec::new() }
    }

    /// Creates a region of `size` bytes whose unclaimed offsets go to `background`.
    pub fn region(name: &str, size: u64, background: Option<ComponentId>) -> Self {
        Self { name: name.to_owned(), limit: Some(size), background, mappings: Vec::new() }
    }

    /// Returns the name of this space.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the installed mappings, highest priority first.
    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    /// Maps `size` bytes at `base` to the start of `component`.
    ///
    /// # Errors
    ///
    /// See [`AddressSpace::map_window`].
    pub fn map(
        &mut self,
        name: &str,
        base: u64,
        size: u64,
        component: ComponentId,
        priority: i32,
    ) -> Result<(), MapError> {
        self.map_window(name, base, RegisterWindow::new(size), component, priority)
    }

    /// Maps a component register window at `base`.
    ///
    /// # Errors
    ///
    /// * `MapError::EmptyRange` for a zero-sized window.
    /// * `MapError::AddressOverflow` if the range wraps, in the space or in the
    ///   component window.
    /// * `MapError::OutOfBounds` if the range leaves a bounded region.
    /// * `MapError::OverlapConflict` if a mapping of the same priority covers any byte of
    ///   the range. The space is left unchanged.
    pub fn map_window(
        &mut self,
        name: &str,
        base: u64,
        window: RegisterWindow,
        component: ComponentId,
        priority: i32,
    ) -> Result<(), MapError> {
        self.insert(Mapping {
            name: name.to_owned(),
            base,
            size: window.size,
            priority,
            offset: window.offset,
            target: MappingTarget::Component(component),
        })
    }

    /// Installs a nested region at `base`.
    ///
    /// The region's own size bounds the mapping.
    ///
    /// # Errors
    ///
    /// Same conditions as [`AddressSpace::map_window`].
    pub fn map_region(&mut self, base: u64, region: Self, priority: i32) -> Result<(), MapError> {
        let size = region.limit.unwrap_or(0);
        self.insert(Mapping {
            name: region.name.clone(),
            base,
            size,
            priority,
            offset: 0,
            target: MappingTarget::Region(region),
        })
    }

    /// Flattens the mapping tree into absolute ranges, each region followed by its
    /// children.
    pub fn entries(&self) -> Vec<MapEntry> {
        let mut out = Vec::new();
        self.collect_entries(0, 0, &mut out);
        out
    }

    fn collect_entries(&self, origin: u64, depth: usize, out: &mut Vec<MapEntry>) {
        for m in &self.mappings {
            let base = origin.saturating_add(m.base);
            let component = match &m.target {
                MappingTarget::Component(id) => Some(*id),
                MappingTarget::Region(r) => r.background,
            };
            out.push(MapEntry {
                name: m.name.clone(),
                base,
                end: base.saturating_add(m.size),
                priority: m.priority,
                depth,
                component,
            });
            if let MappingTarget::Region(r) = &m.target {
                r.collect_entries(base, depth + 1, out);
            }
        }
    }

    /// Finds a nested region by name, searching depth first.
    pub fn region_mut(&mut self, name: &str) -> Option<&mut Self> {
        let index = self.mappings.iter().position(|m| match &m.target {
            MappingTarget::Region(r) => r.name == name || r.contains_region(name),
            MappingTarget::Component(_) => false,
        })?;
        let MappingTarget::Region(region) = &mut self.mappings[index].target else {
            return None;
        };
        if region.name == name { Some(region) } else { region.region_mut(name) }
    }

    fn contains_region(&self, name: &str) -> bool {
        self.mappings.iter().any(|m| match &m.target {
            MappingTarget::Region(r) => r.name == name || r.contains_region(name),
            MappingTarget::Component(_) => false,
        })
    }

    /// Resolves an address to the owning component and component-relative offset.
    ///
    /// # Errors
    ///
    /// Returns `Unmapped` if no mapping, nested mapping or background claims the address.
    pub fn resolve(&self, addr: u64) -> Result<Resolution, Unmapped> {
        self.lookup(addr).ok_or(Unmapped { addr })
    }

    /// Returns whether some component claims `addr`.
    pub fn is_mapped(&self, addr: u64) -> bool {
        self.lookup(addr).is_some()
    }

    fn lookup(&self, addr: u64) -> Option<Resolution> {
        for m in self.mappings.iter().filter(|m| m.contains(addr)) {
            let rel = addr - m.base;
            match &m.target {
                MappingTarget::Component(id) => {
                    return Some(Resolution { component: *id, offset: m.offset + rel });
                }
                MappingTarget::Region(region) => {
                    if let Some(hit) = region.lookup(rel) {
                        return Some(hit);
                    }
                    if let Some(bg) = region.background {
                        return Some(Resolution { component: bg, offset: rel });
                    }
                }
            }
        }
        None
    }

    /// Checks that `size` bytes at `base` could be mapped at `priority`, without mapping
    /// anything.
    ///
    /// # Returns
    ///
    /// One past the last address of the range.
    ///
    /// # Errors
    ///
    /// The range conditions of [`AddressSpace::map_window`].
    pub fn check_range(&self, name: &str, base: u64, size: u64, priority: i32) -> Result<u64, MapError> {
        if size == 0 {
            return Err(MapError::EmptyRange { name: name.to_owned() });
        }
        let end = base
            .checked_add(size)
            .ok_or_else(|| MapError::AddressOverflow { name: name.to_owned(), base, size })?;
        if let Some(limit) = self.limit {
            if end > limit {
                return Err(MapError::OutOfBounds {
                    name: name.to_owned(),
                    region: self.name.clone(),
                    end,
                    limit,
                });
            }
        }
        if let Some(existing) = self
            .mappings
            .iter()
            .find(|m| m.priority == priority && m.overlaps(base, end))
        {
            return Err(MapError::OverlapConflict {
                name: name.to_owned(),
                existing: existing.name.clone(),
                base,
                end,
                priority,
            });
        }
        Ok(end)
    }

    fn insert(&mut self, mapping: Mapping) -> Result<(), MapError> {
        let end = self.check_range(&mapping.name, mapping.base, mapping.size, mapping.priority)?;
        if mapping.offset.checked_add(mapping.size).is_none() {
            return Err(MapError::AddressOverflow {
                name: mapping.name,
                base: mapping.offset,
                size: mapping.size,
            });
        }

        debug!(
            "{}: mapped `{}` [{:#x}, {:#x}) at priority {}",
            self.name, mapping.name, mapping.base, end, mapping.priority
        );
        let at = self.mappings.partition_point(|m| {
            m.priority > mapping.priority || (m.priority == mapping.priority && m.base < mapping.base)
        });
        self.mappings.insert(at, mapping);
        Ok(())
    }
}
