//! Getters and setters of public fields (`PyGetSetDef`).

use wrapgen_core::{ClassEntry, FieldEntry, TypeCheck};

use crate::conversion::{check_expression, converter_spelling, to_cpp, to_python};
use crate::naming;
use crate::writer::CodeWriter;

fn field_access(class: &ClassEntry, field: &FieldEntry) -> String {
    format!(
        "Shiboken::Converter<{} >::toCpp(self)->{}",
        converter_spelling(&class.as_type()),
        field.name
    )
}

/// Emit `static PyObject* <Cls>_get_<field>(PyObject* self, void*)`.
///
/// Object and value-pointer fields share identity with the returned
/// wrapper, which is kept alive by the receiver.
pub fn emit_getter(w: &mut CodeWriter, class: &ClassEntry, field: &FieldEntry) {
    let access = field_access(class, field);
    w.line(format!(
        "static PyObject* {}(PyObject* self, void*)",
        naming::getter(&class.qualified_name, &field.name)
    ));
    w.block("", |w| {
        if field.ty.has_identity() {
            w.line(format!("PyObject* val = {};", to_python(&field.ty, &access)));
            w.line(format!(
                "Shiboken::keepReference(reinterpret_cast<SbkBaseWrapper*>(self), \"{}\", val);",
                field.name
            ));
            w.line("return val;");
        } else {
            w.line(format!("return {};", to_python(&field.ty, &access)));
        }
    });
    w.blank();
}

/// Emit `static int <Cls>_set_<field>(PyObject* self, PyObject* value, void*)`.
pub fn emit_setter(w: &mut CodeWriter, class: &ClassEntry, field: &FieldEntry) {
    let name = &field.name;
    w.line(format!(
        "static int {}(PyObject* self, PyObject* value, void*)",
        naming::setter(&class.qualified_name, name)
    ));
    w.block("", |w| {
        w.block("if (value == 0)", |w| {
            w.line(format!("PyErr_SetString(PyExc_TypeError, \"'{name}' may not be deleted\");"));
            w.line("return -1;");
        });
        let check = check_expression(&field.ty, &TypeCheck::for_type(&field.ty, true), "value");
        w.block(format!("if (!{check})"), |w| {
            w.line(format!(
                "PyErr_SetString(PyExc_TypeError, \"wrong type attributed to '{name}', '{}' or convertible type expected\");",
                field.ty.name
            ));
            w.line("return -1;");
        });
        w.blank();
        let value = if field.ty.is_value() && !field.ty.is_pointer() {
            format!("*{}", to_cpp(&field.ty, "value"))
        } else {
            to_cpp(&field.ty, "value")
        };
        w.line(format!("{} = {value};", field_access(class, field)));
        w.blank();
        if field.ty.has_identity() {
            w.line(format!(
                "Shiboken::keepReference(reinterpret_cast<SbkBaseWrapper*>(self), \"{name}\", value);"
            ));
            w.blank();
        }
        w.line("return 0;");
    });
    w.blank();
}

/// Emit the `PyGetSetDef` table; read-only fields have no setter.
pub fn emit_getset_table(w: &mut CodeWriter, class: &ClassEntry) {
    let qualified = &class.qualified_name;
    w.block_with(
        format!("static PyGetSetDef {}[] =", naming::getset_table(qualified)),
        "};",
        |w| {
            for field in class.fields.iter().filter(|f| !f.is_static) {
                let setter = if field.is_const {
                    "0".to_string()
                } else {
                    naming::setter(qualified, &field.name)
                };
                w.line(format!(
                    "{{const_cast<char*>(\"{}\"), {}, {setter}}},",
                    field.name,
                    naming::getter(qualified, &field.name)
                ));
            }
            w.line("{0}  // Sentinel");
        },
    );
    w.blank();
}
