//! Sequence protocol (`PySequenceMethods`).
//!
//! Only added functions named after a protocol method take part; their
//! bodies are the injected dynamic-facing code.

use wrapgen_core::{ClassEntry, CodeLanguage, FunctionEntry, SnipPosition};

use super::{emit_invalid_check, emit_self_definition};
use crate::naming;
use crate::writer::CodeWriter;

/// Protocol method, parameter list and return type.
pub const SEQUENCE_PROTOCOL: &[(&str, &str, &str)] = &[
    ("__len__", "PyObject* self", "Py_ssize_t"),
    ("__getitem__", "PyObject* self, Py_ssize_t _i", "PyObject*"),
    ("__setitem__", "PyObject* self, Py_ssize_t _i, PyObject* _value", "int"),
    ("__getslice__", "PyObject* self, Py_ssize_t _i1, Py_ssize_t _i2", "PyObject*"),
    ("__setslice__", "PyObject* self, Py_ssize_t _i1, Py_ssize_t _i2, PyObject* _value", "int"),
    ("__contains__", "PyObject* self, PyObject* _value", "int"),
    ("__concat__", "PyObject* self, PyObject* _other", "PyObject*"),
];

/// Table order of the slots and the protocol method filling each.
const SEQUENCE_SLOTS: &[(&str, Option<&str>)] = &[
    ("sq_length", Some("__len__")),
    ("sq_concat", Some("__concat__")),
    ("sq_repeat", None),
    ("sq_item", Some("__getitem__")),
    ("sq_slice", Some("__getslice__")),
    ("sq_ass_item", Some("__setitem__")),
    ("sq_ass_slice", Some("__setslice__")),
    ("sq_contains", Some("__contains__")),
    ("sq_inplace_concat", None),
    ("sq_inplace_repeat", None),
];

pub fn is_sequence_method(name: &str) -> bool {
    SEQUENCE_PROTOCOL.iter().any(|(method, _, _)| *method == name)
}

/// Protocol functions declared by `class`, in protocol order.
pub fn sequence_functions(class: &ClassEntry) -> Vec<(&'static str, &FunctionEntry)> {
    SEQUENCE_PROTOCOL
        .iter()
        .filter_map(|(method, _, _)| {
            class
                .functions
                .iter()
                .find(|f| f.name == *method && !f.is_removed())
                .map(|f| (*method, f))
        })
        .collect()
}

fn slot_function(class_name: &str, method: &str) -> String {
    format!("{}Func_{method}", naming::base_name(class_name))
}

/// Emit one C function per protocol method the class provides.
pub fn emit_sequence_functions(w: &mut CodeWriter, class: &ClassEntry) {
    for (method, function) in sequence_functions(class) {
        let Some((_, params, ret)) = SEQUENCE_PROTOCOL.iter().find(|(m, _, _)| *m == method) else {
            continue;
        };
        let error_return = if *ret == "PyObject*" { "0" } else { "-1" };
        w.line(format!("static {ret} {}({params})", slot_function(&class.qualified_name, method)));
        w.block("", |w| {
            emit_invalid_check(w, "self", error_return);
            emit_self_definition(w, class);
            for position in [SnipPosition::Beginning, SnipPosition::Replace, SnipPosition::End] {
                for snip in function.snips(position, CodeLanguage::Dynamic) {
                    w.code(&snip.code);
                }
            }
        });
        w.blank();
    }
}

/// Emit `static PySequenceMethods <Cls>_as_sequence = { ... };`.
pub fn emit_sequence_table(w: &mut CodeWriter, class: &ClassEntry) {
    let provided: Vec<&str> = sequence_functions(class).into_iter().map(|(m, _)| m).collect();
    let table = naming::sequence_table(&class.qualified_name);
    w.block_with(format!("static PySequenceMethods {table} ="), "};", |w| {
        let last = SEQUENCE_SLOTS.len() - 1;
        for (i, (slot, method)) in SEQUENCE_SLOTS.iter().enumerate() {
            let value = match method {
                Some(m) if provided.contains(m) => format!("&{}", slot_function(&class.qualified_name, m)),
                _ => "0".to_string(),
            };
            let separator = if i == last { "" } else { "," };
            w.line(format!("/*{slot}*/ {value}{separator}"));
        }
    });
    w.blank();
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrapgen_core::{ArgumentEntry, CodeSnip, CppType, FunctionFlags, FunctionModification, PrimitiveKind};

    fn added(name: &str, ret: CppType, code: &str) -> FunctionEntry {
        FunctionEntry::method(name, ret)
            .with_flags(FunctionFlags::USER_ADDED)
            .with_modification(FunctionModification {
                snips: vec![CodeSnip::new(SnipPosition::Beginning, CodeLanguage::Dynamic, code)],
                ..Default::default()
            })
    }

    fn list_class() -> ClassEntry {
        ClassEntry::object("IntList")
            .with_function(added(
                "__len__",
                CppType::primitive(PrimitiveKind::Int),
                "return cppSelf->size();",
            ))
            .with_function(
                added("__getitem__", CppType::custom("PyObject"), "return PyInt_FromLong((*cppSelf)[_i]);")
                    .with_arg(ArgumentEntry::new("_i", CppType::primitive(PrimitiveKind::Int))),
            )
    }

    #[test]
    fn protocol_functions_wrap_injected_code() {
        let mut w = CodeWriter::new();
        emit_sequence_functions(&mut w, &list_class());
        let expected = "\
static Py_ssize_t SbkIntListFunc___len__(PyObject* self)
{
    if (Shiboken::cppObjectIsInvalid(self))
        return -1;
    IntList* cppSelf = Shiboken::Converter<IntList* >::toCpp(self);
    return cppSelf->size();
}

static PyObject* SbkIntListFunc___getitem__(PyObject* self, Py_ssize_t _i)
{
    if (Shiboken::cppObjectIsInvalid(self))
        return 0;
    IntList* cppSelf = Shiboken::Converter<IntList* >::toCpp(self);
    return PyInt_FromLong((*cppSelf)[_i]);
}

";
        assert_eq!(w.finish(), expected);
    }

    #[test]
    fn table_references_provided_slots_only() {
        let mut w = CodeWriter::new();
        emit_sequence_table(&mut w, &list_class());
        let text = w.finish();
        assert!(text.starts_with("static PySequenceMethods SbkIntList_as_sequence = {\n"));
        assert!(text.contains("    /*sq_length*/ &SbkIntListFunc___len__,\n"));
        assert!(text.contains("    /*sq_item*/ &SbkIntListFunc___getitem__,\n"));
        assert!(text.contains("    /*sq_contains*/ 0,\n"));
        assert!(text.ends_with("    /*sq_inplace_repeat*/ 0\n};\n\n"));
        assert!(is_sequence_method("__setslice__"));
    }
}
