//! Wrapper objects and their generational handles.

use std::fmt;

use rustc_hash::FxHashMap;
use wrapgen_core::OwnershipState;

/// Handle to a wrapper stored in the [`BindingManager`](crate::BindingManager).
///
/// The generation detects handles that outlive the wrapper they named.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WrapperId {
    pub index: u32,
    pub generation: u32,
}

impl WrapperId {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl fmt::Display for WrapperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.index, self.generation)
    }
}

/// State of one dynamic-side wrapper around a native object.
#[derive(Debug, Clone)]
pub(crate) struct WrapperObject {
    pub class: String,
    pub address: usize,
    pub ownership: OwnershipState,
    pub valid: bool,
    /// Instance of a dynamic subclass; overrides are looked up on it.
    pub dynamic_class: Option<String>,
    pub registered: bool,
    pub ref_count: u32,
    pub parent: Option<WrapperId>,
    pub children: Vec<WrapperId>,
    /// Keep-alive table: slot name to referenced wrappers.
    pub references: FxHashMap<String, Vec<WrapperId>>,
}

impl WrapperObject {
    pub fn new(class: impl Into<String>, address: usize, ownership: OwnershipState) -> Self {
        Self {
            class: class.into(),
            address,
            ownership,
            valid: true,
            dynamic_class: None,
            registered: false,
            ref_count: 1,
            parent: None,
            children: Vec::new(),
            references: FxHashMap::default(),
        }
    }

    pub fn info(&self, id: WrapperId) -> WrapperInfo {
        WrapperInfo {
            id,
            class: self.class.clone(),
            address: self.address,
            ownership: self.ownership,
            valid: self.valid,
            ref_count: self.ref_count,
            parent: self.parent,
            children: self.children.clone(),
        }
    }
}

/// Snapshot of a wrapper, for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperInfo {
    pub id: WrapperId,
    pub class: String,
    pub address: usize,
    pub ownership: OwnershipState,
    pub valid: bool,
    pub ref_count: u32,
    pub parent: Option<WrapperId>,
    pub children: Vec<WrapperId>,
}

/// Generational arena of wrappers.
#[derive(Debug, Default)]
pub(crate) struct WrapperArena {
    slots: Vec<ArenaSlot>,
    free_list: Vec<u32>,
}

#[derive(Debug)]
struct ArenaSlot {
    generation: u32,
    value: Option<WrapperObject>,
}

impl WrapperArena {
    pub fn allocate(&mut self, object: WrapperObject) -> WrapperId {
        if let Some(index) = self.free_list.pop()
            && let Some(slot) = self.slots.get_mut(index as usize)
        {
            slot.value = Some(object);
            return WrapperId::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(ArenaSlot {
            generation: 0,
            value: Some(object),
        });
        WrapperId::new(index, 0)
    }

    pub fn get(&self, id: WrapperId) -> Option<&WrapperObject> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_mut(&mut self, id: WrapperId) -> Option<&mut WrapperObject> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.value.as_mut()
    }

    pub fn free(&mut self, id: WrapperId) -> Option<WrapperObject> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let object = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index);
        Some(object)
    }

    pub fn ids(&self) -> Vec<WrapperId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.value.is_some())
            .map(|(index, slot)| WrapperId::new(index as u32, slot.generation))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.value.is_some()).count()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_list.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_handles_do_not_resolve() {
        let mut arena = WrapperArena::default();
        let first = arena.allocate(WrapperObject::new("Point", 0x10, OwnershipState::DynamicOwned));
        assert!(arena.free(first).is_some());
        let second = arena.allocate(WrapperObject::new("Size", 0x20, OwnershipState::DynamicOwned));
        assert_eq!(first.index, second.index);
        assert!(arena.get(first).is_none());
        assert_eq!(arena.get(second).map(|w| w.class.as_str()), Some("Size"));
        assert_eq!(arena.len(), 1);
    }
}
