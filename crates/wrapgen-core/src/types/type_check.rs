//! Runtime type-check predicates used by the overload decisor.
//!
//! A [`TypeCheck`] is the generator's description of the test the generated
//! code performs on one dynamic argument. The generator renders it into a
//! C-API call; the runtime model evaluates it against a dynamic value through
//! the [`ArgumentProbe`] trait, so both sides agree on what a position accepts.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ContainerKind, CppType, PrimitiveKind, TypeCategory};

/// Predicate applied to one dynamic argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeCheck {
    /// Numeric check. Permissive checks accept any dynamic number; strict ones
    /// only the exact dynamic number family of `kind`.
    Number { kind: PrimitiveKind, permissive: bool },
    String,
    /// Wrapped class, its subclasses, and anything implicitly convertible to it.
    Wrapper { class: String, accepts_none: bool },
    Enum { name: String },
    Flags { name: String },
    Container { kind: ContainerKind, name: String },
    /// Any dynamic object.
    Any,
    /// User type replacement with its own check function.
    Custom { function: String },
}

impl TypeCheck {
    /// Build the check for a native type.
    ///
    /// `permissive_number` is decided by the decisor from the competing
    /// numeric types at the same position.
    pub fn for_type(ty: &CppType, permissive_number: bool) -> Self {
        match ty.category {
            TypeCategory::Primitive(kind) => TypeCheck::Number {
                kind,
                permissive: permissive_number,
            },
            TypeCategory::CString => TypeCheck::String,
            TypeCategory::Value | TypeCategory::Object => TypeCheck::Wrapper {
                class: ty.name.clone(),
                accepts_none: ty.accepts_none(),
            },
            TypeCategory::Enum => TypeCheck::Enum { name: ty.name.clone() },
            TypeCategory::Flags => TypeCheck::Flags { name: ty.name.clone() },
            TypeCategory::Container(kind) => TypeCheck::Container {
                kind,
                name: ty.name.clone(),
            },
            TypeCategory::Void | TypeCategory::Varargs | TypeCategory::Custom => TypeCheck::Any,
        }
    }
}

impl fmt::Display for TypeCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeCheck::Number { kind, permissive: true } => write!(f, "number({kind})"),
            TypeCheck::Number { kind, permissive: false } => write!(f, "exact({kind})"),
            TypeCheck::String => f.write_str("str"),
            TypeCheck::Wrapper { class, .. } => write!(f, "{class}"),
            TypeCheck::Enum { name } | TypeCheck::Flags { name } => write!(f, "{name}"),
            TypeCheck::Container { kind, name } => write!(f, "{name}:{}", kind.display_name()),
            TypeCheck::Any => f.write_str("object"),
            TypeCheck::Custom { function } => write!(f, "{function}()"),
        }
    }
}

/// Answers type checks for the arguments of one concrete call.
///
/// Positions past the supplied arguments must answer `false`, matching the
/// generated code where an unsupplied argument slot is null.
pub trait ArgumentProbe {
    fn check(&self, position: usize, check: &TypeCheck) -> bool;
}

impl<F> ArgumentProbe for F
where
    F: Fn(usize, &TypeCheck) -> bool,
{
    fn check(&self, position: usize, check: &TypeCheck) -> bool {
        self(position, check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checks_follow_categories() {
        let point = CppType::value("Point").const_ref();
        assert_eq!(
            TypeCheck::for_type(&point, false),
            TypeCheck::Wrapper {
                class: "Point".into(),
                accepts_none: false
            }
        );
        let int = CppType::primitive(PrimitiveKind::Int);
        assert_eq!(
            TypeCheck::for_type(&int, true),
            TypeCheck::Number {
                kind: PrimitiveKind::Int,
                permissive: true
            }
        );
    }

    #[test]
    fn closures_are_probes() {
        let probe = |pos: usize, check: &TypeCheck| pos == 0 && *check == TypeCheck::String;
        assert!(probe.check(0, &TypeCheck::String));
        assert!(!probe.check(1, &TypeCheck::String));
    }
}
