//! The module header, `<module>_python.h`.
//!
//! Every class file and the module file include it. It declares the exported
//! type object pointers, the type check macros, the trampoline subclasses and
//! the converter specializations tying each native type to its wrapper type.

use wrapgen_core::{ClassEntry, EnumEntry};

use crate::GeneratorContext;
use crate::enums::type_ext;
use crate::module::GeneratedFile;
use crate::naming;
use crate::virtual_bridge::VirtualBridge;
use crate::writer::CodeWriter;

fn include_guard(module: &str) -> String {
    format!("SBK_{}_PYTHON_H", module.to_uppercase())
}

/// Enum and flags type names declared by `entries`, enum first.
fn enum_type_names(entries: &[&EnumEntry]) -> Vec<String> {
    let mut names = Vec::new();
    for entry in entries {
        names.push(entry.qualified_name.clone());
        if let Some(flags) = &entry.flags {
            names.push(flags.clone());
        }
    }
    names
}

/// Build the module header for the classes that were generated.
#[tracing::instrument(level = "debug", skip_all, fields(module = %ctx.module()))]
pub fn generate_header(ctx: &GeneratorContext<'_>, classes: &[&ClassEntry]) -> GeneratedFile {
    let module = ctx.module();
    let guard = include_guard(module);
    let enums: Vec<&EnumEntry> = ctx
        .registry
        .global_enums()
        .chain(classes.iter().flat_map(|c| c.enums.iter()))
        .collect();
    let enum_types = enum_type_names(&enums);
    let wrapped: Vec<&ClassEntry> = classes.iter().copied().filter(|c| c.needs_native_wrapper()).collect();

    let mut w = CodeWriter::new();
    w.line(format!("#ifndef {guard}"));
    w.line(format!("#define {guard}"));
    w.blank();
    w.line("#include <Python.h>");
    w.line("#include <conversions.h>");
    w.line("#include <pyenum.h>");
    w.line("#include <basewrapper.h>");
    w.line("#include <bindingmanager.h>");
    w.line("#include <memory>");
    if ctx.options.enable_pyside_extensions && wrapped.iter().any(|c| c.is_qobject()) {
        w.line("#include <dynamicqmetaobject.h>");
    }
    w.blank();

    w.line("// Type objects ---------------------------------------------------");
    for class in classes {
        w.line(format!("extern PyTypeObject* {};", type_ext(&class.qualified_name)));
    }
    for name in &enum_types {
        w.line(format!("extern PyTypeObject* {};", type_ext(name)));
    }
    w.blank();

    w.line("// Type checks ----------------------------------------------------");
    for name in classes.iter().map(|c| &c.qualified_name).chain(enum_types.iter()) {
        let check = naming::check_function(name);
        let ext = type_ext(name);
        w.line(format!("#define {check}(op) PyObject_TypeCheck(op, (PyTypeObject*){ext})"));
        w.line(format!("#define {check}Exact(op) ((op)->ob_type == (PyTypeObject*){ext})"));
    }
    w.blank();

    if !wrapped.is_empty() {
        w.line("// Native wrappers ------------------------------------------------");
        for class in &wrapped {
            VirtualBridge::new(ctx, class).emit_declaration(&mut w);
        }
    }

    w.line("namespace Shiboken");
    w.block_with("", "} // namespace Shiboken", |w| {
        w.line("// Type conversion ------------------------------------------------");
        for name in classes.iter().map(|c| &c.qualified_name).chain(enum_types.iter()) {
            w.line(format!(
                "template<> inline PyTypeObject* SbkType<{name} >() {{ return {}; }}",
                type_ext(name)
            ));
        }
        w.blank();
        for class in classes.iter().filter(|c| !c.is_namespace()) {
            emit_converter(w, class);
        }
        for name in &enum_types {
            w.line(format!("template<> struct Converter<{name} > : EnumConverter<{name} > {{}};"));
        }
    });
    w.blank();
    w.line(format!("#endif // {guard}"));

    GeneratedFile::new(naming::module_header(module), w.finish())
}

fn emit_converter(w: &mut CodeWriter, class: &ClassEntry) {
    let name = &class.qualified_name;
    if class.is_value_type() {
        w.line(format!("template<> struct Converter<{name} > : ValueTypeConverter<{name} > {{}};"));
        w.line(format!("template<> struct Converter<{name}* > : ValueTypeConverter<{name} > {{}};"));
    } else {
        w.line(format!("template<> struct Converter<{name}* > : ObjectTypeConverter<{name} > {{}};"));
    }
    w.line(format!("template<> struct Converter<{name}& > : Converter<{name}* > {{}};"));
    w.line(format!("template<> struct Converter<const {name}& > : Converter<{name}* > {{}};"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrapgen_core::{CppType, FunctionEntry, GeneratorOptions};
    use wrapgen_registry::ApiRegistry;

    fn registry() -> ApiRegistry {
        let mut registry = ApiRegistry::new();
        registry.register_class(ClassEntry::value("Point")).unwrap();
        registry
            .register_class(
                ClassEntry::object("Abstract")
                    .with_function(FunctionEntry::method("pureVirtual", CppType::void()).as_abstract()),
            )
            .unwrap();
        registry
            .register_enum(EnumEntry::new("GlobalEnum", "").with_value("NoThing", 0).with_flags("GlobalFlags"))
            .unwrap();
        registry
    }

    #[test]
    fn declarations_for_every_type() {
        let registry = registry();
        let options = GeneratorOptions::for_module("sample");
        let ctx = GeneratorContext::new(&registry, &options).unwrap();
        let classes: Vec<&ClassEntry> = registry.classes().collect();
        let header = generate_header(&ctx, &classes);
        let text = &header.contents;
        assert_eq!(header.name, "sample_python.h");
        assert!(text.starts_with("#ifndef SBK_SAMPLE_PYTHON_H\n#define SBK_SAMPLE_PYTHON_H\n"));
        assert!(text.ends_with("#endif // SBK_SAMPLE_PYTHON_H\n"));
        for ext in ["SbkPoint_TypeExt", "SbkAbstract_TypeExt", "SbkGlobalEnum_TypeExt", "SbkGlobalFlags_TypeExt"] {
            assert!(text.contains(&format!("extern PyTypeObject* {ext};\n")), "{ext}");
        }
        assert!(text.contains("#define SbkPoint_Check(op) PyObject_TypeCheck(op, (PyTypeObject*)SbkPoint_TypeExt)\n"));
        assert!(text.contains("    template<> inline PyTypeObject* SbkType<Point >() { return SbkPoint_TypeExt; }\n"));
        assert!(text.contains("    template<> struct Converter<Point > : ValueTypeConverter<Point > {};\n"));
        assert!(text.contains("    template<> struct Converter<Abstract* > : ObjectTypeConverter<Abstract > {};\n"));
        assert!(text.contains("    template<> struct Converter<GlobalFlags > : EnumConverter<GlobalFlags > {};\n"));
    }

    #[test]
    fn trampoline_subclasses_are_declared() {
        let registry = registry();
        let options = GeneratorOptions::for_module("sample");
        let ctx = GeneratorContext::new(&registry, &options).unwrap();
        let classes: Vec<&ClassEntry> = registry.classes().collect();
        let text = generate_header(&ctx, &classes).contents;
        let expected = "\
class AbstractWrapper : public Abstract
{
public:
    virtual void pureVirtual();
    virtual ~AbstractWrapper();
};
";
        assert!(text.contains(expected), "{text}");
        assert!(!text.contains("PointWrapper"));
    }
}
