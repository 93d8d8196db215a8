//! Type vocabulary: native types, runtime checks, flags and ownership.

mod cpp_type;
mod flags;
mod ownership;
mod primitive_kind;
mod type_check;

pub use cpp_type::{ContainerKind, CppType, Indirection, TypeCategory};
pub use flags::{ClassFlags, FunctionFlags};
pub use ownership::{
    ArgIndex, LinkAction, OwnershipDirection, OwnershipModification, OwnershipPolicy,
    OwnershipState, ReferenceAction,
};
pub use primitive_kind::PrimitiveKind;
pub use type_check::{ArgumentProbe, TypeCheck};
