//! ApiRegistry - name-keyed storage for the extracted API model.
//!
//! # Storage Model
//!
//! - **Classes**: stored by qualified name; registration order is remembered so
//!   every iteration is deterministic.
//! - **Global functions**: stored in registration order; duplicates are detected
//!   by [`TypeHash`], which encodes the full signature.
//! - **Enums**: global enums and enums nested in classes share one index by
//!   qualified name, so type lookups never care where an enum was declared.
//!
//! # Lifecycle
//!
//! The registry is filled once from the extractor output and is read-only
//! afterwards. [`ApiRegistry::hierarchy`] validates the inheritance graph and
//! builds the [`ClassHierarchy`] consumed by the generator.
//!
//! # Example
//!
//! ```
//! use wrapgen_core::ClassEntry;
//! use wrapgen_registry::ApiRegistry;
//!
//! let mut registry = ApiRegistry::new();
//! registry.register_class(ClassEntry::value("Point")).unwrap();
//! registry.register_class(ClassEntry::object("ObjectType")).unwrap();
//!
//! assert!(registry.class("Point").is_some());
//! assert_eq!(registry.classes().count(), 2);
//! ```

use rustc_hash::{FxHashMap, FxHashSet};

use wrapgen_core::{ClassEntry, EnumEntry, FunctionEntry, RegistrationError, TypeHash};

use crate::ClassHierarchy;

/// Storage for classes, global functions and enums of one module.
#[derive(Debug, Default, Clone)]
pub struct ApiRegistry {
    /// Classes by qualified name.
    classes: FxHashMap<String, ClassEntry>,
    /// Qualified class names in registration order.
    class_order: Vec<String>,

    /// Global functions in registration order.
    functions: Vec<FunctionEntry>,
    /// Signature hashes of registered global functions.
    function_hashes: FxHashSet<TypeHash>,

    /// Enums by qualified name (global and nested).
    enums: FxHashMap<String, EnumEntry>,
    /// Qualified names of global enums in registration order.
    global_enum_order: Vec<String>,
}

impl ApiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    /// Register a class and index the enums it declares.
    pub fn register_class(&mut self, entry: ClassEntry) -> Result<(), RegistrationError> {
        if self.classes.contains_key(&entry.qualified_name) {
            return Err(RegistrationError::DuplicateClass(entry.qualified_name));
        }
        for nested in &entry.enums {
            if self.enums.contains_key(&nested.qualified_name) {
                return Err(RegistrationError::DuplicateEnum(nested.qualified_name.clone()));
            }
        }
        for nested in &entry.enums {
            self.enums.insert(nested.qualified_name.clone(), nested.clone());
        }
        self.class_order.push(entry.qualified_name.clone());
        self.classes.insert(entry.qualified_name.clone(), entry);
        Ok(())
    }

    /// Register a global function.
    pub fn register_function(&mut self, entry: FunctionEntry) -> Result<(), RegistrationError> {
        let hash = entry.type_hash();
        if !self.function_hashes.insert(hash) {
            return Err(RegistrationError::DuplicateFunction(entry.minimal_signature()));
        }
        self.functions.push(entry);
        Ok(())
    }

    /// Register a global enum.
    pub fn register_enum(&mut self, entry: EnumEntry) -> Result<(), RegistrationError> {
        if self.enums.contains_key(&entry.qualified_name) {
            return Err(RegistrationError::DuplicateEnum(entry.qualified_name));
        }
        self.global_enum_order.push(entry.qualified_name.clone());
        self.enums.insert(entry.qualified_name.clone(), entry);
        Ok(())
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    pub fn class(&self, qualified_name: &str) -> Option<&ClassEntry> {
        self.classes.get(qualified_name)
    }

    pub fn contains_class(&self, qualified_name: &str) -> bool {
        self.classes.contains_key(qualified_name)
    }

    /// All classes in registration order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassEntry> {
        self.class_order.iter().filter_map(|name| self.classes.get(name))
    }

    /// Classes this module generates wrappers for.
    pub fn generated_classes(&self) -> impl Iterator<Item = &ClassEntry> {
        self.classes().filter(|c| !c.external)
    }

    pub fn global_functions(&self) -> &[FunctionEntry] {
        &self.functions
    }

    pub fn enum_entry(&self, qualified_name: &str) -> Option<&EnumEntry> {
        self.enums.get(qualified_name)
    }

    /// Global enums in registration order.
    pub fn global_enums(&self) -> impl Iterator<Item = &EnumEntry> {
        self.global_enum_order.iter().filter_map(|name| self.enums.get(name))
    }

    /// Enum whose flags type has this qualified name.
    pub fn enum_for_flags(&self, flags_name: &str) -> Option<&EnumEntry> {
        self.enums
            .values()
            .find(|e| e.flags.as_deref() == Some(flags_name))
    }

    // ==========================================================================
    // Validation
    // ==========================================================================

    /// Validate base references and build the inheritance graph.
    pub fn hierarchy(&self) -> Result<ClassHierarchy, RegistrationError> {
        for class in self.classes() {
            for base in &class.bases {
                if !self.classes.contains_key(base) {
                    return Err(RegistrationError::UnknownBase {
                        class: class.qualified_name.clone(),
                        base: base.clone(),
                    });
                }
            }
        }
        let hierarchy = ClassHierarchy::build(self.classes())?;
        tracing::debug!(classes = self.class_order.len(), "built class hierarchy");
        Ok(hierarchy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrapgen_core::{ArgumentEntry, CppType, PrimitiveKind};

    #[test]
    fn duplicate_class_is_rejected() {
        let mut registry = ApiRegistry::new();
        registry.register_class(ClassEntry::value("Point")).unwrap();
        assert_eq!(
            registry.register_class(ClassEntry::value("Point")),
            Err(RegistrationError::DuplicateClass("Point".into()))
        );
    }

    #[test]
    fn nested_enums_are_indexed() {
        let mut registry = ApiRegistry::new();
        let class = ClassEntry::object("Overload")
            .with_enum(EnumEntry::new("ParamEnum", "Overload").with_value("Param0", 0));
        registry.register_class(class).unwrap();
        assert!(registry.enum_entry("Overload::ParamEnum").is_some());
        assert_eq!(registry.global_enums().count(), 0);
    }

    #[test]
    fn duplicate_global_function_signature_is_rejected() {
        let mut registry = ApiRegistry::new();
        let f = FunctionEntry::method("sum", CppType::primitive(PrimitiveKind::Int))
            .with_arg(ArgumentEntry::new("a", CppType::primitive(PrimitiveKind::Int)));
        registry.register_function(f.clone()).unwrap();
        assert!(matches!(
            registry.register_function(f),
            Err(RegistrationError::DuplicateFunction(_))
        ));
    }

    #[test]
    fn unknown_base_fails_validation() {
        let mut registry = ApiRegistry::new();
        registry
            .register_class(ClassEntry::object("Derived").with_base("Missing"))
            .unwrap();
        assert_eq!(
            registry.hierarchy().err(),
            Some(RegistrationError::UnknownBase {
                class: "Derived".into(),
                base: "Missing".into()
            })
        );
    }

    #[test]
    fn classes_iterate_in_registration_order() {
        let mut registry = ApiRegistry::new();
        for name in ["Zeta", "Alpha", "Mid"] {
            registry.register_class(ClassEntry::object(name)).unwrap();
        }
        let names: Vec<&str> = registry.classes().map(|c| c.qualified_name.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
    }
}
