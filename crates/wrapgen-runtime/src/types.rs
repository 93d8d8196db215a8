//! Runtime view of the wrapped type system.
//!
//! Holds what generated module initialization registers: inheritance links
//! (`addClassInheritance`), implicit conversions, custom check functions,
//! destructor kinds and multiple-inheritance offset functions. Answers the
//! type checks the decisor asks and resolves the most derived known type of
//! a polymorphic object.

use rustc_hash::{FxHashMap, FxHashSet};
use wrapgen_core::{ContainerKind, TypeCheck};

use crate::value::DynValue;

/// Computes the base subobject offsets of an object at `address`.
pub type MiInit = fn(address: usize) -> Vec<isize>;

#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    bases: FxHashMap<String, Vec<String>>,
    subclasses: FxHashMap<String, Vec<String>>,
    /// Target to source type names.
    implicit: FxHashMap<String, Vec<String>>,
    /// Custom check function to accepted type names.
    custom_checks: FxHashMap<String, Vec<String>>,
    virtual_destructors: FxHashSet<String>,
    mi_init: FxHashMap<String, MiInit>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `derived` as a direct subclass of `base`. Repeated links are ignored.
    pub fn add_class_inheritance(&mut self, base: &str, derived: &str) {
        let bases = self.bases.entry(derived.to_string()).or_default();
        if bases.iter().any(|b| b == base) {
            return;
        }
        bases.push(base.to_string());
        self.subclasses
            .entry(base.to_string())
            .or_default()
            .push(derived.to_string());
    }

    pub fn bases(&self, class: &str) -> &[String] {
        self.bases.get(class).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn subclasses(&self, class: &str) -> &[String] {
        self.subclasses.get(class).map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether `derived` is `base` or inherits from it.
    pub fn inherits(&self, derived: &str, base: &str) -> bool {
        let mut pending = vec![derived];
        let mut seen = FxHashSet::default();
        while let Some(class) = pending.pop() {
            if class == base {
                return true;
            }
            if seen.insert(class) {
                pending.extend(self.bases(class).iter().map(String::as_str));
            }
        }
        false
    }

    pub fn add_implicit_conversion(&mut self, source: &str, target: &str) {
        let sources = self.implicit.entry(target.to_string()).or_default();
        if !sources.iter().any(|s| s == source) {
            sources.push(source.to_string());
        }
    }

    /// Whether a value of type `source` converts implicitly into `target`,
    /// directly or through a subclass of a declared source.
    pub fn is_implicitly_convertible(&self, source: &str, target: &str) -> bool {
        self.implicit
            .get(target)
            .is_some_and(|sources| sources.iter().any(|s| self.inherits(source, s)))
    }

    pub fn add_custom_check(&mut self, function: &str, accepted_type: &str) {
        self.custom_checks
            .entry(function.to_string())
            .or_default()
            .push(accepted_type.to_string());
    }

    pub fn set_virtual_destructor(&mut self, class: &str) {
        self.virtual_destructors.insert(class.to_string());
    }

    pub fn has_virtual_destructor(&self, class: &str) -> bool {
        self.virtual_destructors.contains(class)
    }

    pub fn set_mi_init(&mut self, class: &str, init: MiInit) {
        self.mi_init.insert(class.to_string(), init);
    }

    pub fn mi_init(&self, class: &str) -> Option<MiInit> {
        self.mi_init.get(class).copied()
    }

    /// Evaluate a decisor type check against a dynamic value.
    pub fn accepts(&self, value: &DynValue, check: &TypeCheck) -> bool {
        match check {
            TypeCheck::Number { permissive: true, .. } => value.is_number(),
            TypeCheck::Number { kind, permissive: false } => {
                if kind.is_bool() {
                    matches!(value, DynValue::Bool(_))
                } else if kind.is_floating() {
                    matches!(value, DynValue::Float(_))
                } else {
                    value.is_integer()
                }
            }
            TypeCheck::String => matches!(value, DynValue::Str(_)),
            TypeCheck::Wrapper { class, accepts_none } => match value {
                DynValue::None => *accepts_none,
                DynValue::Wrapper { class: actual, .. } => {
                    self.inherits(actual, class) || self.is_implicitly_convertible(actual, class)
                }
                other => self.is_implicitly_convertible(other.type_name(), class),
            },
            TypeCheck::Enum { name } => matches!(value, DynValue::Enum { type_name, .. } if type_name == name),
            TypeCheck::Flags { name } => matches!(value, DynValue::Flags { type_name, .. } if type_name == name),
            TypeCheck::Container { kind, .. } => match kind {
                ContainerKind::List => matches!(value, DynValue::List(_) | DynValue::Tuple(_)),
                ContainerKind::Map => matches!(value, DynValue::Dict(_)),
                ContainerKind::Pair => matches!(value, DynValue::Tuple(items) if items.len() == 2),
            },
            TypeCheck::Any => true,
            TypeCheck::Custom { function } => self
                .custom_checks
                .get(function)
                .is_some_and(|accepted| accepted.iter().any(|t| t == value.type_name())),
        }
    }

    /// The most derived type of an object statically known as `base`.
    ///
    /// Subclasses are explored depth first; a class is tried only after all
    /// of its own subclasses failed. `discover` answers whether the object is
    /// an instance of the given class and stands for the generated
    /// type-discovery functions.
    pub fn resolve_type(&self, base: &str, discover: &mut impl FnMut(&str) -> bool) -> String {
        let mut visited = FxHashSet::default();
        self.identify(base, &mut visited, discover)
            .unwrap_or_else(|| base.to_string())
    }

    fn identify<'s>(
        &'s self,
        class: &'s str,
        visited: &mut FxHashSet<&'s str>,
        discover: &mut impl FnMut(&str) -> bool,
    ) -> Option<String> {
        if !visited.insert(class) {
            return None;
        }
        for subclass in self.subclasses(class) {
            if let Some(found) = self.identify(subclass, visited, discover) {
                return Some(found);
            }
        }
        discover(class).then(|| class.to_string())
    }
}
