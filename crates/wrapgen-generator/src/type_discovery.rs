//! Type discovery, type resolvers and extended converters.
//!
//! When native code hands out a base pointer, the runtime walks the
//! registered subclasses of the static type, deepest first, asking each
//! subclass's discovery function whether the object really is one of them.
//! The first match decides which wrapper type is instantiated.

use wrapgen_core::ClassEntry;

use crate::GeneratorContext;
use crate::conversion::to_cpp;
use crate::enums::type_ext;
use crate::naming;
use crate::writer::CodeWriter;

// ==========================================================================
// Type Discovery
// ==========================================================================

/// Whether `class` gets a discovery function: polymorphic and derived.
pub fn has_type_discovery(class: &ClassEntry) -> bool {
    class.is_polymorphic() && !class.bases.is_empty()
}

/// Emit `static SbkBaseWrapperType* Sbk<Cls>_typeDiscovery(void* cptr, SbkBaseWrapperType* instanceType)`.
///
/// Custom discovery code (with `%1` standing for the inspected pointer)
/// takes precedence over RTTI. RTTI is only usable through polymorphic
/// roots; a non-polymorphic root is reported and skipped.
#[tracing::instrument(level = "debug", skip_all, fields(class = %class.qualified_name))]
pub fn emit_type_discovery(ctx: &GeneratorContext<'_>, w: &mut CodeWriter, class: &ClassEntry) {
    let qualified = &class.qualified_name;
    let type_name = naming::type_object(qualified);
    w.line(format!(
        "static SbkBaseWrapperType* {}(void* cptr, SbkBaseWrapperType* instanceType)",
        naming::type_discovery(qualified)
    ));
    w.block("", |w| {
        if let Some(code) = &class.type_discovery {
            let test = code.replace("%1", &format!("reinterpret_cast<{qualified}*>(cptr)"));
            w.line(format!("if ({test})"));
            w.indented(|w| w.line(format!("return &{type_name};")));
        } else {
            for ancestor in ctx.hierarchy.ancestors(qualified) {
                if !ctx.hierarchy.bases(&ancestor).is_empty() {
                    continue;
                }
                let polymorphic = ctx.class(&ancestor).is_some_and(ClassEntry::is_polymorphic);
                if !polymorphic {
                    tracing::warn!(
                        class = %qualified,
                        root = %ancestor,
                        "inherits from a non polymorphic type, type discovery based on RTTI is impossible"
                    );
                    continue;
                }
                w.line(format!(
                    "if (instanceType == reinterpret_cast<Shiboken::SbkBaseWrapperType*>(Shiboken::SbkType<{ancestor} >()) && dynamic_cast<{qualified}*>(reinterpret_cast<{ancestor}*>(cptr)))"
                ));
                w.indented(|w| w.line(format!("return &{type_name};")));
            }
        }
        w.line("return 0;");
    });
    w.blank();
}

/// Emit the type resolvers registering every spelling under which the
/// class may be named at runtime.
pub fn emit_type_resolvers(w: &mut CodeWriter, class: &ClassEntry) {
    if class.is_namespace() {
        return;
    }
    let qualified = &class.qualified_name;
    let kind = if class.is_value_type() { "Value" } else { "Object" };
    if class.is_value_type() {
        w.line(format!(
            "Shiboken::TypeResolver::createValueTypeResolver<{qualified} >(\"{qualified}\");"
        ));
    }
    w.line(format!(
        "Shiboken::TypeResolver::createObjectTypeResolver<{qualified} >(\"{qualified}*\");"
    ));
    w.line(format!(
        "Shiboken::TypeResolver::create{kind}TypeResolver<{qualified} >(typeid({qualified}).name());"
    ));
    if class.needs_native_wrapper() {
        w.line(format!(
            "Shiboken::TypeResolver::create{kind}TypeResolver<{qualified} >(typeid({}).name());",
            naming::wrapper_class(qualified)
        ));
    }
}

// ==========================================================================
// Extended Converters
// ==========================================================================

/// A class of another module that this module's classes convert into.
#[derive(Debug, Clone)]
pub struct ExtendedConversion<'a> {
    pub target: &'a ClassEntry,
    /// Classes of this module convertible into `target`.
    pub sources: Vec<&'a ClassEntry>,
}

impl<'a> ExtendedConversion<'a> {
    /// Every external class with at least one source in this module.
    pub fn collect(ctx: &GeneratorContext<'a>) -> Vec<Self> {
        ctx.registry
            .classes()
            .filter(|c| c.external)
            .filter_map(|target| {
                let mut sources: Vec<&'a ClassEntry> = Vec::new();
                for conversion in ctx.registry.implicit_conversions(target) {
                    let Some(source) = ctx.class_of(&conversion.source) else {
                        continue;
                    };
                    if !source.external && !sources.iter().any(|s| s.qualified_name == source.qualified_name) {
                        sources.push(source);
                    }
                }
                (!sources.is_empty()).then_some(Self { target, sources })
            })
            .collect()
    }

    pub fn is_convertible_function(&self) -> String {
        format!("ExtendedIsConvertible_{}", naming::flat(&self.target.qualified_name))
    }

    pub fn to_cpp_function(&self) -> String {
        format!("ExtendedToCpp_{}", naming::flat(&self.target.qualified_name))
    }

    /// Emit the `isConvertible` and `toCpp` extension functions.
    pub fn emit_functions(&self, w: &mut CodeWriter) {
        w.line(format!("static bool {}(PyObject* pyobj)", self.is_convertible_function()));
        w.block("", |w| {
            let checks: Vec<String> = self
                .sources
                .iter()
                .map(|s| format!("{}(pyobj)", naming::check_function(&s.qualified_name)))
                .collect();
            w.line(format!("return {};", checks.join("\n        || ")));
        });
        w.line(format!("static void* {}(PyObject* pyobj)", self.to_cpp_function()));
        w.block("", |w| {
            w.line("void* cptr = 0;");
            for (i, source) in self.sources.iter().enumerate() {
                let keyword = if i == 0 { "if" } else { "else if" };
                let ty = source.as_type();
                let converted = if source.is_value_type() {
                    format!("*{}", to_cpp(&ty, "pyobj"))
                } else {
                    to_cpp(&ty, "pyobj")
                };
                w.line(format!("{keyword} ({}(pyobj))", naming::check_function(&source.qualified_name)));
                w.indented(|w| {
                    w.line(format!("cptr = new {}({converted});", self.target.qualified_name));
                });
            }
            w.line("return cptr;");
        });
        w.blank();
    }

    /// Emit the module-init fragment installing the extensions.
    pub fn emit_initialization(&self, w: &mut CodeWriter) {
        let target = &self.target.qualified_name;
        w.line(format!("// Extended implicit conversions for {}", naming::dotted(target)));
        w.line(format!(
            "shiboType = reinterpret_cast<Shiboken::SbkBaseWrapperType*>(Shiboken::SbkType<{target} >());"
        ));
        w.line(format!("shiboType->ext_isconvertible = {};", self.is_convertible_function()));
        w.line(format!("shiboType->ext_tocpp = {};", self.to_cpp_function()));
    }
}

/// `bm.addClassInheritance(...)` lines linking `class` below each base.
pub fn emit_inheritance_links(w: &mut CodeWriter, class: &ClassEntry) {
    let type_name = naming::type_object(&class.qualified_name);
    w.line("Shiboken::BindingManager& bm = Shiboken::BindingManager::instance();");
    for base in &class.bases {
        w.line(format!(
            "bm.addClassInheritance(reinterpret_cast<SbkBaseWrapperType*>({}), &{type_name});",
            type_ext(base)
        ));
    }
}
