//! Storage and relationships of the wrapgen API model.
//!
//! - [`ApiRegistry`] - classes, global functions and enums of one module
//! - [`ClassHierarchy`] - the inheritance graph
//! - [`OverloadGroup`] - candidates sharing one dynamic-visible name
//! - [`ImplicitConversion`] - converting constructors and operators

mod conversions;
mod groups;
mod hierarchy;
mod registry;

pub use conversions::{ConversionVia, ImplicitConversion};
pub use groups::{
    GroupKind, OverloadGroup, class_function_groups, constructor_group, global_function_groups,
};
pub use hierarchy::{ClassHierarchy, ClassNode};
pub use registry::ApiRegistry;
