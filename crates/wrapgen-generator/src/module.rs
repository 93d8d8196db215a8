//! Two-phase module builder.
//!
//! [`ModuleBuilder::collect`] generates every class file; [`ModuleBuilder::finish`]
//! then produces the module header and the module file whose entry point
//! registers types, global functions and enums.
//!
//! ## Algorithm
//!
//! 1. Order the classes so that every class comes after its bases and after
//!    the class it is nested in (repeated passes over the base-before-derived
//!    order until nothing more can be placed).
//! 2. Generate each class. A failure is recorded against that class only;
//!    classes deriving from or nested in a failed class are skipped, since
//!    their registration would reference a type object that does not exist.
//! 3. Emit the module file for whatever was generated successfully.

use rustc_hash::FxHashSet;
use wrapgen_core::{ClassEntry, GenerationError, GenerationErrors};
use wrapgen_registry::global_function_groups;

use crate::GeneratorContext;
use crate::class::{ClassArtifact, ClassGenerator, enclosing_class};
use crate::enums::{emit_enum_definition, emit_enum_initialization, emit_flags_methods, type_ext};
use crate::forward::emit_method_wrapper;
use crate::header::generate_header;
use crate::naming;
use crate::overload::OverloadDecisor;
use crate::protocols::emit_method_table;
use crate::type_discovery::ExtendedConversion;
use crate::writer::CodeWriter;

/// One generated source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub name: String,
    pub contents: String,
}

impl GeneratedFile {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }
}

/// Result of a module build.
#[derive(Debug, Clone, Default)]
pub struct ModuleOutput {
    /// Header first, then class files in registration order, then the module file.
    pub files: Vec<GeneratedFile>,
    /// Per-class generation failures.
    pub errors: GenerationErrors,
    /// Classes left out because an ancestor or enclosing class failed.
    pub skipped: Vec<String>,
}

impl ModuleOutput {
    pub fn file(&self, name: &str) -> Option<&GeneratedFile> {
        self.files.iter().find(|f| f.name == name)
    }
}

/// Registration order: bases and enclosing classes first.
pub fn registration_order<'a>(ctx: &GeneratorContext<'a>) -> Vec<&'a ClassEntry> {
    let mut pending: Vec<&'a ClassEntry> = ctx
        .hierarchy
        .base_before_derived()
        .iter()
        .filter_map(|name| ctx.class(name))
        .filter(|class| !class.external)
        .collect();
    let generated: FxHashSet<&str> = pending.iter().map(|c| c.qualified_name.as_str()).collect();
    let mut placed: FxHashSet<String> = FxHashSet::default();
    let mut order = Vec::with_capacity(pending.len());

    loop {
        let before = order.len();
        pending.retain(|class| {
            let bases_ready = class
                .bases
                .iter()
                .all(|b| placed.contains(b) || !generated.contains(b.as_str()));
            let scope_ready = enclosing_class(ctx, class)
                .is_none_or(|outer| placed.contains(&outer.qualified_name) || outer.external);
            if bases_ready && scope_ready {
                placed.insert(class.qualified_name.clone());
                order.push(*class);
                false
            } else {
                true
            }
        });
        if pending.is_empty() || order.len() == before {
            break;
        }
    }
    for class in pending {
        tracing::warn!(class = %class.qualified_name, "nesting and inheritance form a cycle, registering last");
        order.push(class);
    }
    order
}

/// Builds all files of one module.
pub struct ModuleBuilder<'c, 'a> {
    ctx: &'c GeneratorContext<'a>,
    artifacts: Vec<(&'a ClassEntry, ClassArtifact)>,
    failed: FxHashSet<String>,
    errors: GenerationErrors,
    skipped: Vec<String>,
}

impl<'c, 'a> ModuleBuilder<'c, 'a> {
    pub fn new(ctx: &'c GeneratorContext<'a>) -> Self {
        Self {
            ctx,
            artifacts: Vec::new(),
            failed: FxHashSet::default(),
            errors: GenerationErrors::new(),
            skipped: Vec::new(),
        }
    }

    /// Phase one: generate every class file.
    #[tracing::instrument(level = "debug", skip_all, fields(module = %self.ctx.module()))]
    pub fn collect(&mut self) -> &mut Self {
        for class in registration_order(self.ctx) {
            let blocked = class
                .bases
                .iter()
                .chain(enclosing_class(self.ctx, class).map(|c| &c.qualified_name))
                .find(|name| self.failed.contains(name.as_str()))
                .cloned();
            if let Some(blocker) = blocked {
                tracing::warn!(class = %class.qualified_name, %blocker, "skipped, depends on a class that failed");
                self.failed.insert(class.qualified_name.clone());
                self.skipped.push(class.qualified_name.clone());
                continue;
            }
            match ClassGenerator::new(self.ctx, class).generate() {
                Ok(artifact) => self.artifacts.push((class, artifact)),
                Err(error) => {
                    tracing::warn!(class = %class.qualified_name, %error, "class generation failed");
                    self.failed.insert(class.qualified_name.clone());
                    self.errors.push(error);
                }
            }
        }
        self
    }

    /// Phase two: header and module file.
    ///
    /// Fails only when the module entry point itself cannot be produced.
    #[tracing::instrument(level = "debug", skip_all, fields(module = %self.ctx.module()))]
    pub fn finish(self) -> Result<ModuleOutput, GenerationError> {
        let ctx = self.ctx;
        let classes: Vec<&ClassEntry> = self.artifacts.iter().map(|(class, _)| *class).collect();
        let module_file = self.module_file(&classes).map_err(|error| GenerationError::ModuleInit {
            module: ctx.module().to_string(),
            reason: error.to_string(),
        })?;

        let mut files = Vec::with_capacity(self.artifacts.len() + 2);
        files.push(generate_header(ctx, &classes));
        files.extend(self.artifacts.into_iter().map(|(_, artifact)| artifact.file));
        files.push(module_file);
        Ok(ModuleOutput {
            files,
            errors: self.errors,
            skipped: self.skipped,
        })
    }

    fn module_file(&self, classes: &[&ClassEntry]) -> Result<GeneratedFile, GenerationError> {
        let ctx = self.ctx;
        let module = ctx.module();
        let mut w = CodeWriter::new();

        w.line("#include <Python.h>");
        w.line("#include <shiboken.h>");
        w.line("#include <algorithm>");
        w.line(format!("#include \"{}\"", naming::module_header(module)));
        w.blank();

        w.line("// Global functions ------------------------------------------------------------");
        let groups = global_function_groups(ctx.registry.global_functions());
        let decisors: Vec<OverloadDecisor<'_>> = groups.iter().map(|g| OverloadDecisor::build(ctx, g)).collect();
        for decisor in &decisors {
            emit_method_wrapper(ctx, &mut w, decisor)?;
        }
        let refs: Vec<&OverloadDecisor<'_>> = decisors.iter().collect();
        emit_method_table(ctx, &mut w, &naming::module_methods_table(module), &refs);

        w.line("// Classes initialization functions ------------------------------------------------------------");
        for (_, artifact) in &self.artifacts {
            w.line(format!("{};", artifact.init_function));
        }
        w.blank();

        let global_enums: Vec<_> = ctx.registry.global_enums().collect();
        if !global_enums.is_empty() {
            w.line("// Enum definitions ------------------------------------------------------------");
            for entry in &global_enums {
                if entry.flags.is_some() {
                    emit_flags_methods(&mut w, entry);
                }
                emit_enum_definition(&mut w, entry);
            }
        }

        w.line("// Exported type objects -------------------------------------------------------");
        let enum_names = classes
            .iter()
            .flat_map(|c| c.enums.iter())
            .chain(global_enums.iter().copied())
            .flat_map(|e| std::iter::once(e.qualified_name.clone()).chain(e.flags.clone()));
        for name in classes.iter().map(|c| c.qualified_name.clone()).chain(enum_names) {
            w.line(format!("PyTypeObject* {} = 0;", type_ext(&name)));
        }
        w.blank();

        w.line("// Module initialization ------------------------------------------------------------");
        let extended = ExtendedConversion::collect(ctx);
        if !extended.is_empty() {
            w.line("// Extended Converters");
            for conversion in &extended {
                conversion.emit_functions(&mut w);
            }
        }
        w.blank();

        w.line("#if defined _WIN32 || defined __CYGWIN__");
        w.line("    #define SBK_EXPORT_MODULE __declspec(dllexport)");
        w.line("#elif __GNUC__ >= 4");
        w.line("    #define SBK_EXPORT_MODULE __attribute__ ((visibility(\"default\")))");
        w.line("#else");
        w.line("    #define SBK_EXPORT_MODULE");
        w.line("#endif");
        w.blank();

        w.line(format!("extern \"C\" SBK_EXPORT_MODULE void {}()", naming::module_init(module)));
        w.block("", |w| {
            w.line("Shiboken::initShiboken();");
            w.line(format!(
                "PyObject* module = Py_InitModule(\"{module}\", {});",
                naming::module_methods_table(module)
            ));
            w.blank();
            w.line("// Initialize classes in the type system");
            for (class, _) in &self.artifacts {
                let target = match enclosing_class(ctx, class) {
                    Some(outer) => format!("{}->tp_dict", type_ext(&outer.qualified_name)),
                    None => "module".to_string(),
                };
                w.line(format!("{}({target});", naming::class_init(&class.qualified_name)));
            }
            if !extended.is_empty() {
                w.line("// Initialize extended Converters");
                w.line("Shiboken::SbkBaseWrapperType* shiboType;");
                w.blank();
                for conversion in &extended {
                    conversion.emit_initialization(w);
                    w.blank();
                }
            }
            w.blank();

            if !global_enums.is_empty() {
                w.line("// Initialize enums");
                w.line("PyObject* enum_item;");
                w.blank();
            }
            for entry in &global_enums {
                emit_enum_initialization(w, entry);
            }

            w.line("// Register primitive types on TypeResolver");
            for primitive in primitive_spellings(ctx) {
                w.line(format!(
                    "Shiboken::TypeResolver::createValueTypeResolver<{primitive} >(\"{primitive}\");"
                ));
            }

            w.blank();
            w.block("if (PyErr_Occurred())", |w| {
                w.line("PyErr_Print();");
                w.line(format!("Py_FatalError(\"can't initialize module {module}\");"));
            });
        });
        w.blank();

        Ok(GeneratedFile::new(naming::module_file(module), w.finish()))
    }
}

/// Primitive type spellings used anywhere in the model, in first-use order.
fn primitive_spellings(ctx: &GeneratorContext<'_>) -> Vec<String> {
    let functions = ctx
        .registry
        .classes()
        .flat_map(|c| c.functions.iter())
        .chain(ctx.registry.global_functions().iter());
    let mut seen = FxHashSet::default();
    let mut spellings = Vec::new();
    for function in functions {
        let types = std::iter::once(&function.return_type).chain(function.arguments.iter().map(|a| &a.ty));
        for ty in types.filter(|t| t.as_primitive().is_some()) {
            let spelling = ty.unqualified().cpp_signature();
            if seen.insert(spelling.clone()) {
                spellings.push(spelling);
            }
        }
    }
    spellings
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrapgen_core::{
        ArgIndex, ArgumentEntry, ArgumentModification, CppType, EnumEntry, FunctionEntry, FunctionModification,
        GeneratorOptions, PrimitiveKind,
    };
    use wrapgen_registry::ApiRegistry;

    fn int() -> CppType {
        CppType::primitive(PrimitiveKind::Int)
    }

    fn build(registry: &ApiRegistry) -> Result<ModuleOutput, GenerationError> {
        let options = GeneratorOptions::for_module("sample");
        let ctx = GeneratorContext::new(registry, &options).unwrap();
        let mut builder = ModuleBuilder::new(&ctx);
        builder.collect();
        builder.finish()
    }

    fn broken(name: &str) -> ClassEntry {
        let modification = FunctionModification {
            arguments: vec![ArgumentModification::new(ArgIndex::Arg(1)).removed()],
            ..Default::default()
        };
        ClassEntry::object(name).with_function(
            FunctionEntry::method("doublePlus", int())
                .with_arg(ArgumentEntry::new("x", int()))
                .with_modification(modification),
        )
    }

    #[test]
    fn bases_and_outer_classes_register_first() {
        let mut registry = ApiRegistry::new();
        registry.register_class(ClassEntry::object("Derived").with_base("Base")).unwrap();
        registry.register_class(ClassEntry::object("Outer::Inner")).unwrap();
        registry.register_class(ClassEntry::object("Base")).unwrap();
        registry.register_class(ClassEntry::object("Outer")).unwrap();
        let options = GeneratorOptions::for_module("sample");
        let ctx = GeneratorContext::new(&registry, &options).unwrap();
        let order: Vec<&str> = registration_order(&ctx).iter().map(|c| c.qualified_name.as_str()).collect();
        let position = |name: &str| order.iter().position(|n| *n == name).unwrap();
        assert!(position("Base") < position("Derived"));
        assert!(position("Outer") < position("Outer::Inner"));
    }

    #[test]
    fn module_file_registers_everything() {
        let mut registry = ApiRegistry::new();
        registry.register_class(ClassEntry::object("Base")).unwrap();
        registry.register_class(ClassEntry::object("Base::Inner")).unwrap();
        registry
            .register_function(FunctionEntry::method("gimmeInt", int()))
            .unwrap();
        registry
            .register_enum(EnumEntry::new("GlobalEnum", "").with_value("NoThing", 0))
            .unwrap();
        let output = build(&registry).unwrap();
        assert!(output.errors.is_empty());
        let names: Vec<&str> = output.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["sample_python.h", "base_wrapper.cpp", "base_inner_wrapper.cpp", "sample_module_wrapper.cpp"]
        );

        let text = &output.file("sample_module_wrapper.cpp").unwrap().contents;
        assert!(text.contains("static PyObject* SbksampleModule_gimmeInt(PyObject* self)"));
        assert!(text.contains("    {\"gimmeInt\", (PyCFunction)SbksampleModule_gimmeInt, METH_NOARGS},\n"));
        assert!(text.contains("void init_Base(PyObject* module);\nvoid init_Base_Inner(PyObject* module);\n"));
        assert!(text.contains("PyTypeObject* SbkGlobalEnum_TypeExt = 0;\n"));
        assert!(text.contains("extern \"C\" SBK_EXPORT_MODULE void initsample()\n{\n"));
        assert!(text.contains(
            "    // Initialize classes in the type system\n    init_Base(module);\n    init_Base_Inner(SbkBase_TypeExt->tp_dict);\n"
        ));
        assert!(text.contains("    // Initialize enums\n    PyObject* enum_item;\n\n    // init enum: GlobalEnum\n"));
        assert!(text.contains("    Shiboken::TypeResolver::createValueTypeResolver<int >(\"int\");\n"));
        assert!(text.contains(
            "    if (PyErr_Occurred()) {\n        PyErr_Print();\n        Py_FatalError(\"can't initialize module sample\");\n    }\n}\n"
        ));
    }

    #[test]
    fn failures_stay_with_their_class_and_its_dependents() {
        let mut registry = ApiRegistry::new();
        registry.register_class(broken("Modifications")).unwrap();
        registry
            .register_class(ClassEntry::object("Derived").with_base("Modifications"))
            .unwrap();
        registry.register_class(ClassEntry::value("Point")).unwrap();
        let output = build(&registry).unwrap();

        assert_eq!(output.errors.len(), 1);
        assert_eq!(output.skipped, vec!["Derived".to_string()]);
        assert!(output.file("point_wrapper.cpp").is_some());
        assert!(output.file("modifications_wrapper.cpp").is_none());
        let module = &output.file("sample_module_wrapper.cpp").unwrap().contents;
        assert!(module.contains("init_Point(module);"));
        assert!(!module.contains("init_Modifications"));
        assert!(!module.contains("init_Derived"));
    }

    #[test]
    fn broken_global_functions_fail_module_init() {
        let modification = FunctionModification {
            arguments: vec![ArgumentModification::new(ArgIndex::Arg(1)).removed()],
            ..Default::default()
        };
        let mut registry = ApiRegistry::new();
        registry
            .register_function(
                FunctionEntry::method("doublePlus", int())
                    .with_arg(ArgumentEntry::new("x", int()))
                    .with_modification(modification),
            )
            .unwrap();
        let err = build(&registry).unwrap_err();
        assert!(matches!(err, GenerationError::ModuleInit { ref module, .. } if module == "sample"));
        assert!(err.to_string().starts_with("can't initialize module sample: "));
    }
}
