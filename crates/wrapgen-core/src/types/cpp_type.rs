//! Native type descriptions as seen by the generator.
//!
//! A [`CppType`] pairs a base type name with its [`TypeCategory`] (how values of
//! the type cross into the dynamic side) and its [`Indirection`] (how the value
//! is passed). Containers carry their element types in `instantiations`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::TypeHash;

use super::PrimitiveKind;

/// Container families with a dedicated dynamic-side representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    /// Sequential containers (`std::list`, `std::vector`, `QList`, ...) shown as `list`.
    List,
    /// Associative containers (`std::map`, `QHash`, ...) shown as `dict`.
    Map,
    /// `std::pair`-like containers shown as `2-tuple`.
    Pair,
}

impl ContainerKind {
    /// Name shown in signature listings.
    pub const fn display_name(self) -> &'static str {
        match self {
            ContainerKind::List => "list",
            ContainerKind::Map => "dict",
            ContainerKind::Pair => "2-tuple",
        }
    }
}

/// How values of a type cross the native/dynamic boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeCategory {
    Void,
    Primitive(PrimitiveKind),
    /// `const char*`, converted to and from dynamic strings.
    CString,
    /// Copyable class; the wrapper may hold its own copy.
    Value,
    /// Identity-bearing class; always handled by pointer.
    Object,
    Container(ContainerKind),
    Enum,
    Flags,
    /// Trailing `...` parameter collected as a slice.
    Varargs,
    /// Opaque dynamic object passed through unchanged.
    Custom,
}

/// How a value is passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Indirection {
    #[default]
    Direct,
    Pointer,
    Reference,
    ConstReference,
}

/// A native type reference in a signature, field or return slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CppType {
    /// Qualified base name without indirection (`Point`, `int`, `std::list`).
    pub name: String,
    pub category: TypeCategory,
    #[serde(default)]
    pub indirection: Indirection,
    /// Top-level `const` on a directly passed value.
    #[serde(default)]
    pub is_const: bool,
    /// Template arguments for containers.
    #[serde(default)]
    pub instantiations: Vec<CppType>,
}

impl CppType {
    fn with_category(name: impl Into<String>, category: TypeCategory) -> Self {
        Self {
            name: name.into(),
            category,
            indirection: Indirection::Direct,
            is_const: false,
            instantiations: Vec::new(),
        }
    }

    pub fn void() -> Self {
        Self::with_category("void", TypeCategory::Void)
    }

    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::with_category(kind.cpp_name(), TypeCategory::Primitive(kind))
    }

    pub fn cstring() -> Self {
        let mut ty = Self::with_category("char", TypeCategory::CString);
        ty.indirection = Indirection::Pointer;
        ty.is_const = true;
        ty
    }

    pub fn value(name: impl Into<String>) -> Self {
        Self::with_category(name, TypeCategory::Value)
    }

    /// Object types are always passed by pointer.
    pub fn object(name: impl Into<String>) -> Self {
        Self::with_category(name, TypeCategory::Object).pointer()
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        Self::with_category(name, TypeCategory::Enum)
    }

    pub fn flags(name: impl Into<String>) -> Self {
        Self::with_category(name, TypeCategory::Flags)
    }

    pub fn container(kind: ContainerKind, name: impl Into<String>, instantiations: Vec<CppType>) -> Self {
        let mut ty = Self::with_category(name, TypeCategory::Container(kind));
        ty.instantiations = instantiations;
        ty
    }

    pub fn varargs() -> Self {
        Self::with_category("...", TypeCategory::Varargs)
    }

    pub fn custom(name: impl Into<String>) -> Self {
        let mut ty = Self::with_category(name, TypeCategory::Custom);
        ty.indirection = Indirection::Pointer;
        ty
    }

    // === Builder Methods ===

    pub fn pointer(mut self) -> Self {
        self.indirection = Indirection::Pointer;
        self
    }

    pub fn reference(mut self) -> Self {
        self.indirection = Indirection::Reference;
        self
    }

    pub fn const_ref(mut self) -> Self {
        self.indirection = Indirection::ConstReference;
        self
    }

    pub fn constant(mut self) -> Self {
        self.is_const = true;
        self
    }

    // === Queries ===

    pub fn is_void(&self) -> bool {
        matches!(self.category, TypeCategory::Void) && self.indirection == Indirection::Direct
    }

    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match self.category {
            TypeCategory::Primitive(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn is_pointer(&self) -> bool {
        self.indirection == Indirection::Pointer
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.indirection, Indirection::Reference | Indirection::ConstReference)
    }

    /// A value class passed by pointer.
    pub fn is_value_pointer(&self) -> bool {
        self.category == TypeCategory::Value && self.is_pointer()
    }

    pub fn is_object(&self) -> bool {
        self.category == TypeCategory::Object
    }

    pub fn is_value(&self) -> bool {
        self.category == TypeCategory::Value
    }

    pub fn is_wrapper_class(&self) -> bool {
        matches!(self.category, TypeCategory::Value | TypeCategory::Object)
    }

    pub fn is_varargs(&self) -> bool {
        self.category == TypeCategory::Varargs
    }

    /// Whether the dynamic side may pass `None` for this type.
    pub fn accepts_none(&self) -> bool {
        self.is_object() || self.is_value_pointer() || self.category == TypeCategory::CString
    }

    /// Whether the wrapper for a value of this type shares the native object's identity.
    pub fn has_identity(&self) -> bool {
        self.is_object() || self.is_value_pointer()
    }

    /// Numeric or boolean primitive.
    pub fn is_number(&self) -> bool {
        self.as_primitive().is_some()
    }

    /// Full C++ spelling (`const Point&`, `std::list<int>`, `Size*`).
    pub fn cpp_signature(&self) -> String {
        let mut out = String::new();
        if self.is_const || self.indirection == Indirection::ConstReference {
            out.push_str("const ");
        }
        out.push_str(&self.base_signature());
        match self.indirection {
            Indirection::Direct => {}
            Indirection::Pointer => out.push('*'),
            Indirection::Reference | Indirection::ConstReference => out.push('&'),
        }
        out
    }

    /// Base name with template arguments, without qualifiers.
    pub fn base_signature(&self) -> String {
        if self.instantiations.is_empty() {
            return self.name.clone();
        }
        let args: Vec<String> = self.instantiations.iter().map(CppType::cpp_signature).collect();
        format!("{}<{} >", self.name, args.join(", "))
    }

    /// Name shown in dynamic-language signature listings.
    pub fn display_name(&self) -> String {
        match self.category {
            TypeCategory::CString => "str".to_string(),
            TypeCategory::Primitive(kind) => kind.display_name().to_string(),
            TypeCategory::Container(kind) => kind.display_name().to_string(),
            _ => self.name.replace("::", "."),
        }
    }

    /// Hash of the full spelling.
    pub fn type_hash(&self) -> TypeHash {
        TypeHash::from_name(&self.cpp_signature())
    }

    /// Same type with indirection and constness stripped.
    pub fn unqualified(&self) -> CppType {
        CppType {
            name: self.name.clone(),
            category: self.category,
            indirection: Indirection::Direct,
            is_const: false,
            instantiations: self.instantiations.clone(),
        }
    }
}

impl fmt::Display for CppType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cpp_signature())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signatures_render_indirection() {
        assert_eq!(CppType::value("Point").const_ref().cpp_signature(), "const Point&");
        assert_eq!(CppType::value("Size").pointer().cpp_signature(), "Size*");
        assert_eq!(CppType::object("ObjectType").cpp_signature(), "ObjectType*");
        assert_eq!(CppType::cstring().cpp_signature(), "const char*");
    }

    #[test]
    fn container_signature_includes_arguments() {
        let list = CppType::container(
            ContainerKind::List,
            "std::list",
            vec![CppType::primitive(PrimitiveKind::Int)],
        );
        assert_eq!(list.cpp_signature(), "std::list<int >");
        assert_eq!(list.display_name(), "list");
    }

    #[test]
    fn none_is_accepted_for_identity_types() {
        assert!(CppType::object("ObjectType").accepts_none());
        assert!(CppType::value("Point").pointer().accepts_none());
        assert!(!CppType::value("Point").const_ref().accepts_none());
        assert!(!CppType::primitive(PrimitiveKind::Int).accepts_none());
    }

    #[test]
    fn display_name_uses_dynamic_spellings() {
        assert_eq!(CppType::primitive(PrimitiveKind::Double).display_name(), "float");
        assert_eq!(CppType::enumeration("Overload::FunctionEnum").display_name(), "Overload.FunctionEnum");
        assert_eq!(CppType::cstring().display_name(), "str");
    }
}
