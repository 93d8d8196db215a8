//! Dynamic-side values as seen by generated code.

use wrapgen_core::{ArgumentProbe, TypeCheck};

use crate::object::WrapperId;
use crate::types::TypeRegistry;

/// A value living on the dynamic side.
#[derive(Debug, Clone, PartialEq)]
pub enum DynValue {
    None,
    Bool(bool),
    /// Dynamic ints are unbounded; `i128` holds every native integer width.
    Int(i128),
    Float(f64),
    Str(String),
    Enum { type_name: String, value: i64 },
    Flags { type_name: String, value: i64 },
    /// A wrapped native object.
    Wrapper { id: WrapperId, class: String },
    List(Vec<DynValue>),
    Tuple(Vec<DynValue>),
    Dict(Vec<(DynValue, DynValue)>),
    /// Any other dynamic object, known only by its type name.
    Object { type_name: String },
}

impl DynValue {
    pub fn wrapper(id: WrapperId, class: impl Into<String>) -> Self {
        DynValue::Wrapper { id, class: class.into() }
    }

    pub fn enumerator(type_name: impl Into<String>, value: i64) -> Self {
        DynValue::Enum {
            type_name: type_name.into(),
            value,
        }
    }

    /// Type name used in error messages.
    pub fn type_name(&self) -> &str {
        match self {
            DynValue::None => "NoneType",
            DynValue::Bool(_) => "bool",
            DynValue::Int(_) => "int",
            DynValue::Float(_) => "float",
            DynValue::Str(_) => "str",
            DynValue::Enum { type_name, .. } | DynValue::Flags { type_name, .. } => type_name,
            DynValue::Wrapper { class, .. } => class,
            DynValue::List(_) => "list",
            DynValue::Tuple(_) => "tuple",
            DynValue::Dict(_) => "dict",
            DynValue::Object { type_name } => type_name,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, DynValue::None)
    }

    /// Anything the dynamic runtime treats as a number.
    pub fn is_number(&self) -> bool {
        matches!(
            self,
            DynValue::Bool(_) | DynValue::Int(_) | DynValue::Float(_) | DynValue::Enum { .. } | DynValue::Flags { .. }
        )
    }

    /// Integer-like: plain ints and their subtypes (bools, enumerators).
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DynValue::Bool(_) | DynValue::Int(_) | DynValue::Enum { .. } | DynValue::Flags { .. }
        )
    }

    pub fn wrapper_id(&self) -> Option<WrapperId> {
        match self {
            DynValue::Wrapper { id, .. } => Some(*id),
            _ => None,
        }
    }
}

/// Arguments of one call, checked against a type registry.
///
/// Implements [`ArgumentProbe`] so a decisor can pick an overload for them.
#[derive(Debug, Clone, Copy)]
pub struct CallArguments<'a> {
    pub args: &'a [DynValue],
    types: &'a TypeRegistry,
}

impl<'a> CallArguments<'a> {
    pub fn new(args: &'a [DynValue], types: &'a TypeRegistry) -> Self {
        Self { args, types }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Comma-separated type names, as shown in wrong-argument errors.
    pub fn received(&self) -> String {
        self.args.iter().map(DynValue::type_name).collect::<Vec<_>>().join(", ")
    }
}

impl ArgumentProbe for CallArguments<'_> {
    fn check(&self, position: usize, check: &TypeCheck) -> bool {
        self.args.get(position).is_some_and(|value| self.types.accepts(value, check))
    }
}
