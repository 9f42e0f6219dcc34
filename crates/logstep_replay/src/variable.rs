//! Variable containers and the arena that backs heap aliasing.
//!
//! Every children map lives in a [`VariableArena`] slot. A container refers to
//! its children through a [`ChildrenId`] handle, so two containers holding the
//! same handle observe each other's mutations. The [`ReferenceMap`] records
//! which slot a log heap address resolved to.

use indexmap::IndexMap;
use logstep_core::VariablesRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Value shown for a declared variable that has not been assigned
pub const UNASSIGNED: &str = "null";

/// Handle to a children map in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChildrenId(usize);

impl ChildrenId {
    /// Arena slot index
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }

    /// Protocol handle for this map; never zero
    #[must_use]
    pub fn variables_ref(self) -> VariablesRef {
        VariablesRef::new(u32::try_from(self.0 + 1).unwrap_or(u32::MAX))
    }

    /// Arena handle named by a protocol handle
    #[must_use]
    pub fn from_variables_ref(handle: VariablesRef) -> Option<Self> {
        (!handle.is_none()).then(|| Self(handle.get() as usize - 1))
    }
}

/// Ordered name to container map
pub type VariableMap = IndexMap<String, VariableContainer>;

/// One variable as reconstructed from the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableContainer {
    /// Variable or field name
    pub name: String,
    /// Declared type, empty when only seen through an object payload
    pub type_name: String,
    /// Display value; empty for objects
    pub value: String,
    /// Children map, present for objects
    pub children: Option<ChildrenId>,
    /// Heap address the children map belongs to
    pub reference: Option<String>,
}

impl VariableContainer {
    /// Declared variable with no value yet
    #[must_use]
    pub fn declared(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            value: UNASSIGNED.to_string(),
            children: None,
            reference: None,
        }
    }

    /// Whether the container has been given a value
    #[must_use]
    pub fn is_assigned(&self) -> bool {
        self.value != UNASSIGNED || self.children.is_some()
    }

    /// Point this container at a shared children map
    pub fn alias(&mut self, children: ChildrenId, address: &str) {
        self.children = Some(children);
        self.reference = Some(address.to_string());
        self.value.clear();
    }

    /// Replace the value with a plain scalar
    pub fn set_scalar(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.children = None;
        self.reference = None;
    }
}

/// Storage for every children map in a session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableArena {
    maps: Vec<VariableMap>,
}

impl VariableArena {
    /// Create an empty arena
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh, empty children map
    pub fn alloc(&mut self) -> ChildrenId {
        self.maps.push(VariableMap::new());
        ChildrenId(self.maps.len() - 1)
    }

    /// Children map for a handle
    #[must_use]
    pub fn get(&self, id: ChildrenId) -> Option<&VariableMap> {
        self.maps.get(id.0)
    }

    /// Mutable children map for a handle
    pub fn get_mut(&mut self, id: ChildrenId) -> Option<&mut VariableMap> {
        self.maps.get_mut(id.0)
    }

    /// Container by name inside a map
    #[must_use]
    pub fn container(&self, id: ChildrenId, name: &str) -> Option<&VariableContainer> {
        self.get(id)?.get(name)
    }

    /// Mutable container by name inside a map
    pub fn container_mut(&mut self, id: ChildrenId, name: &str) -> Option<&mut VariableContainer> {
        self.get_mut(id)?.get_mut(name)
    }

    /// Whether a map holds a name
    #[must_use]
    pub fn contains(&self, id: ChildrenId, name: &str) -> bool {
        self.container(id, name).is_some()
    }

    /// Container by name, inserting an unassigned one if missing
    pub fn entry(&mut self, id: ChildrenId, name: &str) -> Option<&mut VariableContainer> {
        let map = self.get_mut(id)?;
        Some(
            map.entry(name.to_string())
                .or_insert_with(|| VariableContainer::declared(name, "")),
        )
    }

    /// Follow a dotted path of names starting at a map
    #[must_use]
    pub fn lookup(&self, root: ChildrenId, path: &str) -> Option<&VariableContainer> {
        let mut segments = path.split('.');
        let mut current = self.container(root, segments.next()?)?;
        for segment in segments {
            current = self.container(current.children?, segment)?;
        }
        Some(current)
    }

    /// Number of allocated maps
    #[must_use]
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    /// Whether nothing has been allocated
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

/// Heap address to children map table; grows for the whole session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceMap {
    by_address: HashMap<String, ChildrenId>,
}

impl ReferenceMap {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Children map registered for an address
    #[must_use]
    pub fn get(&self, address: &str) -> Option<ChildrenId> {
        self.by_address.get(address).copied()
    }

    /// Whether an address is known
    #[must_use]
    pub fn contains(&self, address: &str) -> bool {
        self.by_address.contains_key(address)
    }

    /// Record an address; the first registration wins
    pub fn register(&mut self, address: &str, children: ChildrenId) -> ChildrenId {
        *self
            .by_address
            .entry(address.to_string())
            .or_insert(children)
    }

    /// Forget every address
    pub fn clear(&mut self) {
        self.by_address.clear();
    }

    /// Number of known addresses
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    /// Whether no address is known
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}
