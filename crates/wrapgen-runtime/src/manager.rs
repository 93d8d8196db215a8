//! BindingManager - object identity registry and ownership state machine.
//!
//! Every native object reachable from the dynamic side has at most one live
//! wrapper, found by address. Each wrapper is in exactly one ownership state:
//!
//! ```text
//!                 set_parent(Some)               transfer_to_native
//!   DynamicOwned -----------------> Parented ----------------------> NativeOwned
//!        ^  ^                          |                                 |
//!        |  +--------------------------+                                 |
//!        |      set_parent(None) / transfer_to_dynamic                   |
//!        +---------------------------------------------------------------+
//!                              transfer_to_dynamic
//! ```
//!
//! - The native object of a `DynamicOwned` wrapper is deleted when the
//!   wrapper is collected, and only then.
//! - A parent holds a reference on each child; when a parent's native object
//!   is deleted its children are invalidated recursively, never deleted on
//!   their own.
//! - Invalidated wrappers stay allocated while referenced but every access
//!   fails with `InvalidObject`.
//!
//! All state sits behind the global lock, so the registry is only ever
//! touched by the thread holding it.

use std::cell::RefCell;

use rustc_hash::FxHashMap;
use wrapgen_core::{OwnershipState, ReferenceAction};

use crate::dispatch::DynamicClass;
use crate::error::{RuntimeError, RuntimeResult};
use crate::lock::{GlobalLock, GlobalLockGuard};
use crate::mi::MiOffsetCache;
use crate::object::{WrapperArena, WrapperId, WrapperInfo, WrapperObject};
use crate::types::TypeRegistry;

#[derive(Debug, Default)]
pub(crate) struct BindingState {
    pub wrappers: WrapperArena,
    pub addresses: FxHashMap<usize, WrapperId>,
    pub types: TypeRegistry,
    pub offsets: MiOffsetCache,
    pub dynamic_classes: FxHashMap<String, DynamicClass>,
    /// Native objects deleted on behalf of the dynamic side, in order.
    pub deleted: Vec<usize>,
}

/// Held while running dynamic-side code from a native thread.
pub struct GilState<'a> {
    guard: GlobalLockGuard<'a, RefCell<BindingState>>,
}

impl GilState<'_> {
    /// Release the lock around native work.
    pub fn allow_threads<R>(&mut self, f: impl FnOnce() -> R) -> R {
        self.guard.allow_threads(f)
    }
}

/// The object identity registry.
#[derive(Debug, Default)]
pub struct BindingManager {
    state: GlobalLock<RefCell<BindingState>>,
}

impl BindingManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut BindingState) -> R) -> R {
        let guard = self.state.acquire();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    /// Take the global lock for the current thread.
    pub fn gil(&self) -> GilState<'_> {
        GilState {
            guard: self.state.acquire(),
        }
    }

    /// Run `f` with the global lock released.
    pub fn allow_threads<R>(&self, f: impl FnOnce() -> R) -> R {
        self.gil().allow_threads(f)
    }

    pub fn with_types<R>(&self, f: impl FnOnce(&mut TypeRegistry) -> R) -> R {
        self.with_state(|state| f(&mut state.types))
    }

    /// Copy of the type registry, for use outside the lock.
    pub fn types(&self) -> TypeRegistry {
        self.with_state(|state| state.types.clone())
    }

    // ========================================================================
    // Wrapper creation and identity
    // ========================================================================

    /// Allocate an unregistered wrapper with one reference.
    pub fn create_wrapper(&self, class: &str, address: usize, ownership: OwnershipState) -> WrapperId {
        self.with_state(|state| state.wrappers.allocate(WrapperObject::new(class, address, ownership)))
    }

    /// Map the wrapper's address (and every base subobject address of a
    /// multiply inheriting type) to it.
    ///
    /// Registering the same wrapper again is a no-op; registering a second
    /// live wrapper for the same native object fails.
    pub fn register_wrapper(&self, id: WrapperId) -> RuntimeResult<()> {
        self.with_state(|state| state.register(id))
    }

    /// Drop the address mapping of a wrapper.
    pub fn release_wrapper(&self, id: WrapperId) {
        self.with_state(|state| state.unregister(id));
    }

    pub fn retrieve_wrapper(&self, address: usize) -> Option<WrapperId> {
        self.with_state(|state| state.addresses.get(&address).copied())
    }

    pub fn has_wrapper(&self, address: usize) -> bool {
        self.retrieve_wrapper(address).is_some()
    }

    /// Run a wrapped constructor.
    ///
    /// Abstract classes can only be instantiated through a dynamic subclass.
    /// The wrapper is registered exactly once, after `create` succeeded; a
    /// failing `create` leaves the registry untouched.
    #[tracing::instrument(level = "debug", skip(self, create))]
    pub fn construct(
        &self,
        class: &str,
        is_abstract: bool,
        dynamic_class: Option<&str>,
        create: impl FnOnce() -> RuntimeResult<usize>,
    ) -> RuntimeResult<WrapperId> {
        if is_abstract && dynamic_class.is_none() {
            return Err(RuntimeError::AbstractInstantiation { class: class.to_string() });
        }
        let address = create()?;
        self.with_state(|state| {
            let mut object = WrapperObject::new(class, address, OwnershipState::DynamicOwned);
            object.dynamic_class = dynamic_class.map(str::to_string);
            let id = state.wrappers.allocate(object);
            if let Err(error) = state.register(id) {
                state.wrappers.free(id);
                state.deleted.push(address);
                return Err(error);
            }
            Ok(id)
        })
    }

    /// The wrapper for a native object crossing into the dynamic side.
    ///
    /// An existing wrapper gains a reference and keeps its identity.
    /// Otherwise a new one is created for the most derived type `discover`
    /// recognizes, starting from the static type `class`.
    pub fn wrap_native(
        &self,
        class: &str,
        address: usize,
        ownership: OwnershipState,
        discover: &mut impl FnMut(&str) -> bool,
    ) -> RuntimeResult<WrapperId> {
        if let Some(id) = self.with_state(|state| state.acquire(address)) {
            return Ok(id);
        }
        let resolved = self.types().resolve_type(class, discover);
        tracing::debug!(class, resolved = %resolved, "wrapping native object");
        self.with_state(|state| {
            // `discover` may have wrapped the object in the meantime.
            if let Some(id) = state.acquire(address) {
                return Ok(id);
            }
            let id = state.wrappers.allocate(WrapperObject::new(resolved, address, ownership));
            if let Err(error) = state.register(id) {
                state.wrappers.free(id);
                return Err(error);
            }
            Ok(id)
        })
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn wrapper(&self, id: WrapperId) -> Option<WrapperInfo> {
        self.with_state(|state| state.wrappers.get(id).map(|w| w.info(id)))
    }

    pub fn is_valid(&self, id: WrapperId) -> bool {
        self.with_state(|state| state.wrappers.get(id).is_some_and(|w| w.valid))
    }

    /// `InvalidObject` unless the native object behind `id` is still alive.
    pub fn check_valid(&self, id: WrapperId) -> RuntimeResult<()> {
        self.with_state(|state| state.live(id).map(|_| ()))
    }

    pub fn ownership(&self, id: WrapperId) -> Option<OwnershipState> {
        self.with_state(|state| state.wrappers.get(id).map(|w| w.ownership))
    }

    pub fn ref_count(&self, id: WrapperId) -> u32 {
        self.with_state(|state| state.wrappers.get(id).map_or(0, |w| w.ref_count))
    }

    pub fn parent(&self, id: WrapperId) -> Option<WrapperId> {
        self.with_state(|state| state.wrappers.get(id).and_then(|w| w.parent))
    }

    pub fn children(&self, id: WrapperId) -> Vec<WrapperId> {
        self.with_state(|state| state.wrappers.get(id).map(|w| w.children.clone()).unwrap_or_default())
    }

    /// Wrappers kept alive by `owner` under `slot`.
    pub fn references(&self, owner: WrapperId, slot: &str) -> Vec<WrapperId> {
        self.with_state(|state| {
            state
                .wrappers
                .get(owner)
                .and_then(|w| w.references.get(slot).cloned())
                .unwrap_or_default()
        })
    }

    /// Native objects deleted because their dynamic-owned wrapper died.
    pub fn deleted_natives(&self) -> Vec<usize> {
        self.with_state(|state| state.deleted.clone())
    }

    pub fn wrapper_count(&self) -> usize {
        self.with_state(|state| state.wrappers.len())
    }

    // ========================================================================
    // Reference counting
    // ========================================================================

    pub fn inc_ref(&self, id: WrapperId) {
        self.with_state(|state| {
            if let Some(object) = state.wrappers.get_mut(id) {
                object.ref_count += 1;
            }
        });
    }

    /// Drop one reference. Returns whether the wrapper was collected.
    pub fn dec_ref(&self, id: WrapperId) -> bool {
        self.with_state(|state| state.release(id).contains(&id))
    }

    // ========================================================================
    // Ownership
    // ========================================================================

    /// Make `child` a child of `parent`, or give it back to the dynamic side
    /// when `parent` is `None`.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn set_parent(&self, parent: Option<WrapperId>, child: WrapperId) -> RuntimeResult<()> {
        self.with_state(|state| state.set_parent(parent, child))
    }

    /// Native code takes responsibility for deleting the object.
    ///
    /// Types with a virtual destructor keep a valid wrapper that native
    /// deletion will invalidate; for other types the wrapper can no longer
    /// be trusted and is invalidated at once.
    pub fn transfer_ownership_to_native(&self, id: WrapperId) -> RuntimeResult<()> {
        self.with_state(|state| {
            let class = state.live(id)?.class.clone();
            let keeps_wrapper = state.types.has_virtual_destructor(&class);
            if let Some(object) = state.wrappers.get_mut(id) {
                object.ownership = OwnershipState::NativeOwned;
            }
            state.detach_from_parent(id);
            if !keeps_wrapper {
                state.invalidate(id);
            }
            Ok(())
        })
    }

    /// The dynamic side becomes responsible for deleting the object.
    pub fn transfer_ownership_to_dynamic(&self, id: WrapperId) -> RuntimeResult<()> {
        self.with_state(|state| {
            state.live(id)?;
            if let Some(object) = state.wrappers.get_mut(id) {
                object.ownership = OwnershipState::DynamicOwned;
            }
            state.detach_from_parent(id);
            Ok(())
        })
    }

    /// Invalidate a wrapper and, recursively, its children.
    pub fn invalidate(&self, id: WrapperId) {
        self.with_state(|state| state.invalidate(id));
    }

    /// The native object at `address` was deleted by native code.
    pub fn native_destroyed(&self, address: usize) {
        self.with_state(|state| {
            if let Some(id) = state.addresses.get(&address).copied() {
                state.invalidate(id);
            }
        });
    }

    /// Update the keep-alive table of `owner`.
    pub fn keep_reference(
        &self,
        owner: WrapperId,
        slot: &str,
        referred: Option<WrapperId>,
        action: ReferenceAction,
    ) -> RuntimeResult<()> {
        self.with_state(|state| state.keep_reference(owner, slot, referred, action))
    }

    /// Invalidate and forget every wrapper. Returns how many there were.
    pub fn teardown(&self) -> usize {
        self.with_state(|state| {
            let ids = state.wrappers.ids();
            for id in &ids {
                state.invalidate(*id);
            }
            state.wrappers.clear();
            state.addresses.clear();
            tracing::debug!(wrappers = ids.len(), "binding manager torn down");
            ids.len()
        })
    }
}

impl BindingState {
    pub fn live(&self, id: WrapperId) -> RuntimeResult<&WrapperObject> {
        match self.wrappers.get(id) {
            Some(object) if object.valid => Ok(object),
            Some(object) => Err(RuntimeError::InvalidObject {
                class: object.class.clone(),
            }),
            None => Err(RuntimeError::InvalidObject { class: id.to_string() }),
        }
    }

    fn register(&mut self, id: WrapperId) -> RuntimeResult<()> {
        let (class, address) = {
            let object = self.live(id)?;
            if object.registered {
                return Ok(());
            }
            (object.class.clone(), object.address)
        };
        let mut addresses = vec![address];
        if let Some(init) = self.types.mi_init(&class) {
            let table = self.offsets.offsets(&class, || init(address));
            addresses.extend(table.iter().map(|offset| address.wrapping_add_signed(*offset)));
        }
        if let Some(&taken) = addresses.iter().find(|a| self.claimed_by_other(**a, id)) {
            return Err(RuntimeError::DoubleRegistration { address: taken });
        }
        for mapped in addresses {
            self.addresses.insert(mapped, id);
        }
        if let Some(object) = self.wrappers.get_mut(id) {
            object.registered = true;
        }
        Ok(())
    }

    /// `address` maps to a live wrapper other than `id`.
    fn claimed_by_other(&self, address: usize, id: WrapperId) -> bool {
        self.addresses
            .get(&address)
            .is_some_and(|&existing| existing != id && self.wrappers.get(existing).is_some_and(|w| w.valid))
    }

    /// Add a reference to the wrapper already mapped to `address`.
    fn acquire(&mut self, address: usize) -> Option<WrapperId> {
        let id = *self.addresses.get(&address)?;
        let object = self.wrappers.get_mut(id)?;
        object.ref_count += 1;
        Some(id)
    }

    fn unregister(&mut self, id: WrapperId) {
        self.addresses.retain(|_, mapped| *mapped != id);
        if let Some(object) = self.wrappers.get_mut(id) {
            object.registered = false;
        }
    }

    fn invalidate(&mut self, id: WrapperId) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let Some(object) = self.wrappers.get_mut(current) else {
                continue;
            };
            if !object.valid {
                continue;
            }
            object.valid = false;
            if object.ownership == OwnershipState::DynamicOwned {
                object.ownership = OwnershipState::NativeOwned;
            }
            pending.extend(object.children.iter().copied());
            self.unregister(current);
        }
    }

    /// Remove `child` from its parent and drop the reference the parent held.
    fn detach_from_parent(&mut self, child: WrapperId) {
        let Some(parent) = self.wrappers.get_mut(child).and_then(|w| w.parent.take()) else {
            return;
        };
        if let Some(parent) = self.wrappers.get_mut(parent) {
            parent.children.retain(|c| *c != child);
        }
        self.release(child);
    }

    fn is_ancestor(&self, candidate: WrapperId, of: WrapperId) -> bool {
        let mut current = Some(of);
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            current = self.wrappers.get(id).and_then(|w| w.parent);
        }
        false
    }

    fn set_parent(&mut self, parent: Option<WrapperId>, child: WrapperId) -> RuntimeResult<()> {
        self.live(child)?;
        let current = self.wrappers.get(child).and_then(|w| w.parent);
        if current == parent && parent.is_some() {
            return Ok(());
        }
        let Some(parent) = parent else {
            if let Some(object) = self.wrappers.get_mut(child) {
                object.ownership = OwnershipState::DynamicOwned;
            }
            self.detach_from_parent(child);
            return Ok(());
        };
        self.live(parent)?;
        if self.is_ancestor(child, parent) {
            tracing::warn!(%parent, %child, "refusing a parent link that would form a cycle");
            return Ok(());
        }
        // The new parent's reference is taken before the old one is dropped.
        if let Some(object) = self.wrappers.get_mut(child) {
            object.ref_count += 1;
        }
        self.detach_from_parent(child);
        if let Some(object) = self.wrappers.get_mut(child) {
            object.parent = Some(parent);
            object.ownership = OwnershipState::Parented;
        }
        if let Some(object) = self.wrappers.get_mut(parent) {
            object.children.push(child);
        }
        Ok(())
    }

    fn keep_reference(
        &mut self,
        owner: WrapperId,
        slot: &str,
        referred: Option<WrapperId>,
        action: ReferenceAction,
    ) -> RuntimeResult<()> {
        self.live(owner)?;
        let dropped = {
            let Some(object) = self.wrappers.get_mut(owner) else {
                return Ok(());
            };
            match action {
                ReferenceAction::Add => Vec::new(),
                ReferenceAction::Set | ReferenceAction::Remove => {
                    object.references.remove(slot).unwrap_or_default()
                }
            }
        };
        if action != ReferenceAction::Remove
            && let Some(referred) = referred
        {
            if let Some(target) = self.wrappers.get_mut(referred) {
                target.ref_count += 1;
            }
            if let Some(object) = self.wrappers.get_mut(owner) {
                object.references.entry(slot.to_string()).or_default().push(referred);
            }
        }
        for id in dropped {
            self.release(id);
        }
        Ok(())
    }

    /// Drop one reference from `id`, collecting wrappers that reach zero.
    /// Returns the collected wrappers.
    fn release(&mut self, id: WrapperId) -> Vec<WrapperId> {
        let mut collected = Vec::new();
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let Some(object) = self.wrappers.get_mut(current) else {
                continue;
            };
            object.ref_count = object.ref_count.saturating_sub(1);
            if object.ref_count > 0 {
                continue;
            }
            let native_deleted = object.valid && object.ownership == OwnershipState::DynamicOwned;
            if native_deleted {
                self.deleted.push(object.address);
                // Deleting a native parent deletes its native children.
                self.invalidate(current);
            }
            self.unregister(current);
            let Some(object) = self.wrappers.free(current) else {
                continue;
            };
            if let Some(parent) = object.parent
                && let Some(parent) = self.wrappers.get_mut(parent)
            {
                parent.children.retain(|c| *c != current);
            }
            for child in &object.children {
                if let Some(child) = self.wrappers.get_mut(*child) {
                    child.parent = None;
                    if child.ownership == OwnershipState::Parented {
                        child.ownership = OwnershipState::NativeOwned;
                    }
                }
            }
            pending.extend(object.children.iter().copied());
            pending.extend(object.references.into_values().flatten());
            collected.push(current);
        }
        collected
    }
}
