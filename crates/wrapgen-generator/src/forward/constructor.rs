//! Constructor dispatchers (`tp_init`).
//!
//! The constructed native object is attached to the wrapper, marked valid and
//! registered with the binding manager. Abstract classes refuse direct
//! instantiation; a dynamic subclass of one is fine because the trampoline
//! subclass is what gets constructed.

use wrapgen_core::{ClassEntry, CodeLanguage, GenerationError, SnipPosition};

use super::{constructed_type, emit_function_calls, keyword_parameters};
use crate::GeneratorContext;
use crate::naming;
use crate::overload::OverloadDecisor;
use crate::writer::CodeWriter;

/// Emit `static int <Class>_Init(PyObject* self, PyObject* args, PyObject* kwds)`.
#[tracing::instrument(level = "debug", skip_all, fields(class = %class.qualified_name))]
pub fn emit_constructor_wrapper(
    ctx: &GeneratorContext<'_>,
    w: &mut CodeWriter,
    class: &ClassEntry,
    decisor: &OverloadDecisor<'_>,
) -> Result<(), GenerationError> {
    let name = naming::group_function(decisor.group(), ctx.module());
    let mut outcome = Ok(());
    w.block(format!("static int {name}(PyObject* self, PyObject* args, PyObject* kwds)"), |w| {
        outcome = emit_body(ctx, w, class, decisor, &name);
    });
    w.blank();
    outcome
}

fn emit_body(
    ctx: &GeneratorContext<'_>,
    w: &mut CodeWriter,
    class: &ClassEntry,
    decisor: &OverloadDecisor<'_>,
    name: &str,
) -> Result<(), GenerationError> {
    let qualified = &class.qualified_name;
    let constructed = constructed_type(ctx, qualified);
    let sbk_type = format!("Shiboken::SbkType<{qualified} >()");
    let error_label = format!("{name}_TypeError");
    let full_name = format!("{}.{}", ctx.module(), naming::dotted(qualified));
    let max = decisor.max_args();
    let reflected = decisor.is_reflected_constructor();

    if !class.has_private_destructor() {
        w.line(format!(
            "if (Shiboken::isUserType(self) && !Shiboken::canCallConstructor(self->ob_type, {sbk_type}))"
        ));
        w.indented(|w| w.line("return -1;"));
        w.blank();
    }

    w.line(format!("{constructed}* cptr = 0;"));
    if max > 0 {
        w.line("int overloadId = -1;");
    }
    let property_names = if reflected { reflected_argument_names(decisor) } else { Vec::new() };
    if reflected {
        if property_names.is_empty() {
            w.line("const char** argNames = 0;");
        } else {
            let quoted: Vec<String> = property_names.iter().map(|n| format!("\"{n}\"")).collect();
            w.line(format!("const char* argNames[] = {{{}}};", quoted.join(", ")));
        }
    }
    w.line("SbkBaseWrapper* sbkSelf = reinterpret_cast<SbkBaseWrapper*>(self);");

    if class.is_abstract() {
        let type_object = naming::type_object(qualified);
        w.block(format!("if (self->ob_type == (PyTypeObject*)&{type_object})"), |w| {
            w.line(format!(
                "PyErr_SetString(PyExc_NotImplementedError, \"'{qualified}' represents a C++ abstract class and cannot be instantiated\");"
            ));
            w.line("return -1;");
        });
        w.blank();
    }

    if ctx.hierarchy.uses_multiple_inheritance(qualified) {
        let type_object = naming::type_object(qualified);
        w.line("SbkBaseWrapperType* type = reinterpret_cast<SbkBaseWrapperType*>(self->ob_type);");
        w.line(format!("SbkBaseWrapperType* myType = reinterpret_cast<SbkBaseWrapperType*>(&{type_object});"));
        w.block("if (type != myType)", |w| {
            w.line("type->mi_init = myType->mi_init;");
            w.line("type->mi_offsets = myType->mi_offsets;");
            w.line("type->mi_specialcast = myType->mi_specialcast;");
        });
        w.blank();
    }

    if decisor.uses_named_arguments() && !reflected {
        w.line("int numNamedArgs = (kwds ? PyDict_Size(kwds) : 0);");
    }
    w.blank();

    if max > 0 {
        decisor.emit_arguments_initializer(w, &decisor.group().name, &full_name, &error_label, "-1");
        decisor.emit_decisor(w, &error_label);
    }
    emit_function_calls(ctx, w, decisor, "-1")?;
    w.blank();

    w.block(format!(
        "if (PyErr_Occurred() || !Shiboken::setCppPointer(sbkSelf, {sbk_type}, cptr))"
    ), |w| {
        w.line("delete cptr;");
        w.line("return -1;");
    });
    if max > 0 {
        w.line(format!("if (!cptr) goto {error_label};"));
        w.blank();
    }
    w.line("sbkSelf->validCppObject = 1;");
    if class.needs_native_wrapper() {
        w.line("sbkSelf->containsCppWrapper = 1;");
    }
    w.line("BindingManager::instance().registerWrapper(sbkSelf, cptr);");

    if reflected {
        w.blank();
        w.line("// QObject setup");
        w.line("PySide::signalUpdateSource(self);");
        w.line(format!(
            "if (kwds && !PySide::fillQtProperties(self, &{qualified}::staticMetaObject, kwds, argNames, {}))",
            property_names.len()
        ));
        w.indented(|w| w.line("return -1;"));
    }

    emit_end_snips(w, decisor);

    w.blank();
    w.line("return 1;");

    if max > 0 {
        w.blank();
        decisor.emit_error_section(w, &error_label, &full_name, ctx.options.verbose_error_messages, "-1");
    }
    Ok(())
}

/// Keyword names consumed as arguments; any other keyword is a property.
fn reflected_argument_names(decisor: &OverloadDecisor<'_>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for function in &decisor.group().functions {
        for (_, name) in keyword_parameters(function) {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

/// Injected code that runs once the wrapper is fully initialized.
fn emit_end_snips(w: &mut CodeWriter, decisor: &OverloadDecisor<'_>) {
    let functions = &decisor.group().functions;
    let has_end = |i: usize| {
        functions[i]
            .snips(SnipPosition::End, CodeLanguage::Dynamic)
            .next()
            .is_some()
    };
    if !(0..functions.len()).any(has_end) {
        return;
    }
    w.blank();
    w.line("// Constructor code injections, position=end");
    w.block("switch (overloadId)", |w| {
        for (index, function) in functions.iter().enumerate().filter(|(i, _)| has_end(*i)) {
            w.line(format!("case {index}:"));
            w.block("", |w| {
                for snip in function.snips(SnipPosition::End, CodeLanguage::Dynamic) {
                    w.code(&snip.code);
                }
                w.line("break;");
            });
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrapgen_core::{
        ArgumentEntry, ClassFlags, CodeSnip, CppType, FunctionEntry, FunctionModification, GeneratorOptions,
        PrimitiveKind,
    };
    use wrapgen_registry::{ApiRegistry, constructor_group};

    fn render(classes: Vec<ClassEntry>, name: &str) -> String {
        let mut registry = ApiRegistry::new();
        for class in classes {
            registry.register_class(class).unwrap();
        }
        let options = GeneratorOptions::for_module("sample");
        let ctx = GeneratorContext::new(&registry, &options).unwrap();
        let class = ctx.class(name).unwrap();
        let group = constructor_group(class).unwrap();
        let decisor = OverloadDecisor::build(&ctx, &group);
        let mut w = CodeWriter::new();
        emit_constructor_wrapper(&ctx, &mut w, class, &decisor).unwrap();
        w.finish()
    }

    fn int() -> CppType {
        CppType::primitive(PrimitiveKind::Int)
    }

    #[test]
    fn value_class_constructor() {
        let point = ClassEntry::value("Point")
            .with_function(FunctionEntry::constructor("Point"))
            .with_function(
                FunctionEntry::constructor("Point")
                    .with_arg(ArgumentEntry::new("x", int()))
                    .with_arg(ArgumentEntry::new("y", int())),
            );
        let text = render(vec![point], "Point");
        assert!(text.starts_with("static int SbkPoint_Init(PyObject* self, PyObject* args, PyObject* kwds) {\n"));
        assert!(text.contains(
            "    if (Shiboken::isUserType(self) && !Shiboken::canCallConstructor(self->ob_type, Shiboken::SbkType<Point >()))\n        return -1;"
        ));
        assert!(text.contains("    Point* cptr = 0;\n    int overloadId = -1;\n"));
        assert!(text.contains("cptr = new Point(cpp_arg0, cpp_arg1);"));
        assert!(text.contains("    if (!cptr) goto SbkPoint_Init_TypeError;\n"));
        assert!(!text.contains("containsCppWrapper"));
        assert!(text.contains("    BindingManager::instance().registerWrapper(sbkSelf, cptr);\n\n    return 1;\n"));
    }

    #[test]
    fn abstract_classes_refuse_direct_instantiation() {
        let abstract_class = ClassEntry::object("Abstract")
            .with_function(FunctionEntry::constructor("Abstract"))
            .with_function(FunctionEntry::method("pureVirtual", CppType::void()).as_abstract());
        let text = render(vec![abstract_class], "Abstract");
        assert!(text.contains("    AbstractWrapper* cptr = 0;\n"));
        assert!(text.contains(
            "\"'Abstract' represents a C++ abstract class and cannot be instantiated\""
        ));
        assert!(text.contains("cptr = new AbstractWrapper();"));
        assert!(text.contains("    sbkSelf->containsCppWrapper = 1;\n"));
        assert!(!text.contains("overloadId = -1"));
    }

    #[test]
    fn multiple_inheritance_copies_the_cast_tables() {
        let classes = vec![
            ClassEntry::object("Base1").with_virtual_destructor(),
            ClassEntry::object("Base2").with_virtual_destructor(),
            ClassEntry::object("MDerived")
                .with_base("Base1")
                .with_base("Base2")
                .with_virtual_destructor()
                .with_function(FunctionEntry::constructor("MDerived")),
        ];
        let text = render(classes, "MDerived");
        assert!(text.contains("reinterpret_cast<SbkBaseWrapperType*>(&SbkMDerived_Type);"));
        assert!(text.contains("        type->mi_specialcast = myType->mi_specialcast;\n"));
    }

    #[test]
    fn reflected_constructors_fill_properties() {
        let object = ClassEntry::object("Widget")
            .with_flags(ClassFlags::QOBJECT)
            .with_virtual_destructor()
            .with_function(
                FunctionEntry::constructor("Widget").with_arg(
                    ArgumentEntry::new("parent", CppType::object("Widget")).with_default("0"),
                ),
            );
        let text = render(vec![object], "Widget");
        assert!(text.contains("const char* argNames[] = {\"parent\"};"));
        assert!(!text.contains("numNamedArgs ="));
        assert!(text.contains("PySide::fillQtProperties(self, &Widget::staticMetaObject, kwds, argNames, 1)"));
    }

    #[test]
    fn end_snips_run_after_registration() {
        let modification = FunctionModification {
            snips: vec![CodeSnip::new(SnipPosition::End, CodeLanguage::Dynamic, "initialize(cptr);")],
            ..Default::default()
        };
        let point = ClassEntry::value("Point")
            .with_function(FunctionEntry::constructor("Point"))
            .with_function(
                FunctionEntry::constructor("Point")
                    .with_arg(ArgumentEntry::new("x", int()))
                    .with_modification(modification),
            );
        let text = render(vec![point], "Point");
        let registration = text.find("registerWrapper").unwrap();
        let snip = text.find("initialize(cptr);").unwrap();
        assert!(snip > registration);
        assert!(text.contains("        case 1:\n        {\n            initialize(cptr);\n            break;\n        }\n"));
    }
}
