//! In-process model of the runtime contracts generated bindings rely on.
//!
//! Generated wrapper code calls into a support library for object identity,
//! ownership, overload checks, virtual dispatch and reflection. This crate
//! models that library so the contracts can be exercised without an
//! interpreter:
//!
//! - [`BindingManager`] - native address to wrapper registry, reference
//!   counts, parent/child ownership and the global lock
//! - [`TypeRegistry`] - inheritance, implicit conversions and argument checks
//! - [`DynValue`] - dynamic-side values, and [`CallArguments`] to feed them to
//!   an overload decisor
//! - [`FromDyn`], [`IntoDyn`] - converters between native and dynamic values
//! - [`DynamicClass`], [`VirtualMethod`] - dynamic overrides of virtual methods
//! - [`DynamicMetaObject`] - signals, slots and properties of dynamic classes
//! - [`MiOffsetCache`] - multiple-inheritance offset tables
//!
//! All state is guarded by one re-entrant lock standing in for the
//! interpreter lock; see [`GlobalLock`].

pub mod convert;
pub mod dispatch;
pub mod error;
pub mod keywords;
pub mod lock;
pub mod manager;
pub mod meta_object;
pub mod mi;
pub mod object;
pub mod types;
pub mod value;

pub use convert::{EnumValue, FromDyn, IntoDyn, sequence_to_argv, sequence_to_int_array};
pub use dispatch::{DynMethod, DynamicClass, OverrideNotFound, VirtualMethod};
pub use error::{ConversionError, RuntimeError, RuntimeResult};
pub use keywords::{Parameter, check_argument_count, resolve_arguments};
pub use lock::{GlobalLock, GlobalLockGuard};
pub use manager::{BindingManager, GilState};
pub use meta_object::{
    DynamicAttribute, DynamicMetaObject, MetaObjectLimits, MethodFlags, PropertyFlags, PropertySpec,
    ReflectionError, StaticMetaObject,
};
pub use mi::{MiOffsetCache, OFFSET_TABLE_END};
pub use object::{WrapperId, WrapperInfo};
pub use types::{MiInit, TypeRegistry};
pub use value::{CallArguments, DynValue};
