//! GeneratorContext - read-only view of the model shared by all emitters.

use wrapgen_core::{ClassEntry, CppType, GeneratorOptions, RegistrationError};
use wrapgen_registry::{ApiRegistry, ClassHierarchy};

/// Registry, validated hierarchy and options for one generation run.
pub struct GeneratorContext<'a> {
    pub registry: &'a ApiRegistry,
    pub hierarchy: ClassHierarchy,
    pub options: &'a GeneratorOptions,
}

impl<'a> GeneratorContext<'a> {
    /// Validate the model and build the context.
    pub fn new(registry: &'a ApiRegistry, options: &'a GeneratorOptions) -> Result<Self, RegistrationError> {
        Ok(Self {
            registry,
            hierarchy: registry.hierarchy()?,
            options,
        })
    }

    pub fn module(&self) -> &str {
        &self.options.module_name
    }

    pub fn class(&self, qualified_name: &str) -> Option<&'a ClassEntry> {
        self.registry.class(qualified_name)
    }

    /// Class backing a wrapped type, if any.
    pub fn class_of(&self, ty: &CppType) -> Option<&'a ClassEntry> {
        if ty.is_wrapper_class() {
            self.registry.class(&ty.name)
        } else {
            None
        }
    }

    pub fn has_implicit_conversions(&self, ty: &CppType) -> bool {
        self.class_of(ty)
            .is_some_and(|class| !self.registry.implicit_conversions(class).is_empty())
    }

    /// Error value returned by a dispatcher of this kind.
    pub fn error_return(is_constructor: bool) -> &'static str {
        if is_constructor { "-1" } else { "0" }
    }
}
