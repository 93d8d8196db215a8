//! Rich comparison dispatcher (`tp_richcompare`).
//!
//! One `switch (op)` over the comparison groups. Inside a case the other
//! operand is tested against each candidate's argument type in declaration
//! order; a class comparing with itself also accepts anything implicitly
//! convertible to it. Operators the class does not declare raise
//! `NotImplementedError`.

use wrapgen_core::{ClassEntry, PrimitiveKind, TypeCheck};
use wrapgen_registry::{GroupKind, OverloadGroup};

use crate::GeneratorContext;
use crate::conversion::{check_expression, converter_spelling, to_cpp};
use crate::naming;
use crate::writer::CodeWriter;

/// Emit `static PyObject* <Cls>_richcompare(PyObject* self, PyObject* other, int op)`.
#[tracing::instrument(level = "debug", skip_all, fields(class = %class.qualified_name))]
pub fn emit_richcompare(ctx: &GeneratorContext<'_>, w: &mut CodeWriter, class: &ClassEntry, groups: &[OverloadGroup]) {
    let qualified = &class.qualified_name;
    let base = naming::base_name(qualified);
    let type_error = format!("{base}_RichComparison_TypeError");

    w.line(format!("static PyObject* {}(PyObject* self, PyObject* other, int op)", naming::richcompare(qualified)));
    w.block("", |w| {
        w.line("bool result = false;");
        w.line(format!(
            "{qualified}& cpp_self = *Shiboken::Converter<{} >::toCpp(self);",
            converter_spelling(&class.as_type())
        ));
        w.blank();
        w.block("switch (op)", |w| {
            for group in groups.iter().filter(|g| g.kind == GroupKind::Comparison) {
                emit_case(ctx, w, class, group, &type_error);
            }
            w.line("default:");
            w.indented(|w| {
                w.line("PyErr_SetString(PyExc_NotImplementedError, \"operator not implemented.\");");
                w.line("return 0;");
            });
        });
        w.blank();
        w.line("if (result)");
        w.indented(|w| w.line("Py_RETURN_TRUE;"));
        w.line(format!("{type_error}:"));
        w.line("Py_RETURN_FALSE;");
    });
    w.blank();
}

fn emit_case(ctx: &GeneratorContext<'_>, w: &mut CodeWriter, class: &ClassEntry, group: &OverloadGroup, type_error: &str) {
    let Some(op) = group.reference().and_then(|f| f.operator_kind()) else {
        return;
    };
    let Some(opcode) = op.compare_opcode() else {
        return;
    };
    let symbol = op.cpp_symbol();
    let candidates: Vec<_> = group
        .functions
        .iter()
        .filter(|f| !f.is_static() && !f.arguments.is_empty())
        .collect();
    let numeric_alternatives = candidates.iter().filter(|f| f.arguments[0].ty.is_number()).count();

    w.line(format!("case {opcode}:"));
    w.indent();
    let mut compares_with_same_type = false;
    for (i, function) in candidates.iter().enumerate() {
        let ty = &function.arguments[0].ty;
        compares_with_same_type |= ty.name == class.qualified_name && ty.is_wrapper_class();
        let permissive = numeric_alternatives == 1 || ty.as_primitive() == Some(PrimitiveKind::Int);
        let check = check_expression(ty, &TypeCheck::for_type(ty, permissive), "other");
        let keyword = if i == 0 { "if" } else { "} else if" };
        w.line(format!("{keyword} ({check}) {{"));
        w.indented(|w| {
            w.line(format!("// {}", function.signature()));
            if ty.is_value() {
                w.line(format!("{}* cpp_other = {};", ty.name, to_cpp(ty, "other")));
                let by_value = format!("Shiboken::Converter<{} >::toCpp(other)", ty.name);
                w.line(format!(
                    "result = !cpp_other ? cpp_self {symbol} {by_value} : (cpp_self {symbol} (*cpp_other));"
                ));
            } else {
                w.line(format!("{} cpp_other = {};", converter_spelling(ty), to_cpp(ty, "other")));
                w.line(format!("result = (cpp_self {symbol} cpp_other);"));
            }
        });
    }

    if compares_with_same_type && ctx.has_implicit_conversions(&class.as_type()) {
        let qualified = &class.qualified_name;
        w.line(format!("}} else if (Shiboken::Converter<{qualified} >::isConvertible(other)) {{"));
        w.indented(|w| {
            w.line(format!("{qualified} cpp_other = Shiboken::Converter<{qualified} >::toCpp(other);"));
            w.line(format!("result = (cpp_self {symbol} cpp_other);"));
        });
    }
    if candidates.is_empty() {
        w.line(format!("goto {type_error};"));
    } else {
        w.line(format!("}} else goto {type_error};"));
    }
    w.blank();
    w.line("break;");
    w.dedent();
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrapgen_core::{ArgumentEntry, CppType, FunctionEntry, FunctionKind, GeneratorOptions, OperatorKind};
    use wrapgen_registry::{ApiRegistry, class_function_groups};

    fn bool_ty() -> CppType {
        CppType::primitive(PrimitiveKind::Bool)
    }

    fn render(classes: Vec<ClassEntry>, name: &str) -> String {
        let mut registry = ApiRegistry::new();
        for class in classes {
            registry.register_class(class).unwrap();
        }
        let options = GeneratorOptions::for_module("sample");
        let ctx = GeneratorContext::new(&registry, &options).unwrap();
        let class = ctx.class(name).unwrap();
        let groups = class_function_groups(class);
        let mut w = CodeWriter::new();
        emit_richcompare(&ctx, &mut w, class, &groups);
        w.finish()
    }

    fn point() -> ClassEntry {
        let point = CppType::value("Point");
        ClassEntry::value("Point")
            .with_function(
                FunctionEntry::operator(OperatorKind::Equal, bool_ty())
                    .with_arg(ArgumentEntry::new("other", point.clone().const_ref())),
            )
            .with_function(
                FunctionEntry::operator(OperatorKind::Less, bool_ty())
                    .with_arg(ArgumentEntry::new("x", CppType::primitive(PrimitiveKind::Double))),
            )
    }

    #[test]
    fn value_comparisons_accept_pointers_and_values() {
        let text = render(vec![point()], "Point");
        assert!(text.starts_with("static PyObject* SbkPoint_richcompare(PyObject* self, PyObject* other, int op)\n{\n"));
        assert!(text.contains("    Point& cpp_self = *Shiboken::Converter<Point* >::toCpp(self);\n"));
        assert!(text.contains("        case Py_EQ:\n            if (Shiboken::Converter<Point >::isConvertible(other)) {\n"));
        assert!(text.contains("                Point* cpp_other = Shiboken::Converter<Point* >::toCpp(other);\n"));
        assert!(text.contains(
            "result = !cpp_other ? cpp_self == Shiboken::Converter<Point >::toCpp(other) : (cpp_self == (*cpp_other));"
        ));
        assert!(text.contains("            } else goto SbkPoint_RichComparison_TypeError;\n\n            break;\n"));
        assert!(text.contains("        case Py_LT:\n            if (PyNumber_Check(other)) {\n"));
        assert!(text.contains("                double cpp_other = Shiboken::Converter<double >::toCpp(other);\n                result = (cpp_self < cpp_other);\n"));
        assert!(text.contains(
            "        default:\n            PyErr_SetString(PyExc_NotImplementedError, \"operator not implemented.\");\n            return 0;\n"
        ));
        assert!(text.ends_with("    if (result)\n        Py_RETURN_TRUE;\n    SbkPoint_RichComparison_TypeError:\n    Py_RETURN_FALSE;\n}\n\n"));
    }

    #[test]
    fn implicit_conversions_are_a_fallback() {
        let size = ClassEntry::value("Size")
            .with_function(
                FunctionEntry::operator(OperatorKind::Equal, bool_ty())
                    .with_arg(ArgumentEntry::new("other", CppType::value("Size").const_ref())),
            )
            .with_function(
                FunctionEntry::new("Size", FunctionKind::Constructor, CppType::void())
                    .with_arg(ArgumentEntry::new("p", CppType::value("Point").const_ref())),
            );
        let text = render(vec![ClassEntry::value("Point"), size], "Size");
        assert!(text.contains("} else if (Shiboken::Converter<Size >::isConvertible(other)) {"));
        assert!(text.contains("Size cpp_other = Shiboken::Converter<Size >::toCpp(other);"));
    }
}
