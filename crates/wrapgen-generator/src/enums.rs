//! Enum and flags types.
//!
//! Every enum becomes an integer subtype whose enumerators are registered
//! both as attributes of the enclosing scope (class dictionary or module)
//! and in the enum type's own dictionary. An enum paired with a flags type
//! also gets the flags type object and its `&`, `|`, `^` and `~` slots.

use wrapgen_core::EnumEntry;

use crate::naming;
use crate::protocols::NumberSlots;
use crate::type_object::{TypeSlots, emit_type_object};
use crate::writer::CodeWriter;

/// Flags operators as protocol method and native operator.
const FLAGS_BINARY_OPERATORS: &[(&str, &str)] = &[("__and__", "&"), ("__or__", "|"), ("__xor__", "^")];

fn unqualified(name: &str) -> &str {
    name.rsplit_once("::").map_or(name, |(_, last)| last)
}

fn new_function(entry: &EnumEntry) -> String {
    format!("{}_New", naming::enum_base(entry))
}

fn flags_operator(entry: &EnumEntry, method: &str) -> String {
    format!("{}_{method}", naming::enum_base(entry))
}

/// `SbkX_TypeExt`: the exported pointer other modules reach the type by.
pub fn type_ext(qualified_name: &str) -> String {
    format!("{}_TypeExt", naming::base_name(qualified_name))
}

// ==========================================================================
// Definitions
// ==========================================================================

/// Emit the getset list, type object and `tp_new` of an enum, followed by
/// its flags type when it has one.
pub fn emit_enum_definition(w: &mut CodeWriter, entry: &EnumEntry) {
    let base = naming::enum_base(entry);
    let new_fn = new_function(entry);

    w.block_with(format!("static PyGetSetDef {base}_getsetlist[] ="), "};", |w| {
        w.line("{const_cast<char*>(\"name\"), (getter)Shiboken::SbkEnumObject_name},");
        w.line("{0}  // Sentinel");
    });
    w.blank();
    w.line("// forward declaration of new function");
    w.line(format!("static PyObject* {new_fn}(PyTypeObject*, PyObject*, PyObject*);"));
    w.blank();

    let mut slots = TypeSlots::new()
        .with("tp_name", format!("\"{}\"", entry.name))
        .with("tp_basicsize", "sizeof(Shiboken::SbkEnumObject)")
        .with("tp_repr", "Shiboken::SbkEnumObject_repr")
        .with("tp_str", "Shiboken::SbkEnumObject_repr")
        .with("tp_flags", "Py_TPFLAGS_DEFAULT")
        .with("tp_getset", format!("{base}_getsetlist"))
        .with("tp_base", "&PyInt_Type")
        .with("tp_new", new_fn.clone());
    if entry.flags.is_some() {
        slots.set("tp_as_number", format!("&{}", naming::number_table(&entry.qualified_name)));
    }
    emit_type_object(
        w,
        &naming::type_object(&entry.qualified_name),
        "&Shiboken::SbkEnumType_Type",
        &slots,
    );

    w.line(format!("static PyObject* {new_fn}(PyTypeObject* type, PyObject* args, PyObject* kwds)"));
    w.block("", |w| {
        w.line("int item_value = 0;");
        w.line("if (!PyArg_ParseTuple(args, \"|i:__new__\", &item_value))");
        w.indented(|w| w.line("return 0;"));
        w.line("PyObject* self = Shiboken::SbkEnumObject_New(type, item_value);");
        w.blank();
        w.line("if (!self)");
        w.indented(|w| w.line("return 0;"));
        w.line("return self;");
    });
    w.blank();

    if let Some(flags) = &entry.flags {
        emit_flags_definition(w, entry, flags);
    }
}

fn emit_flags_definition(w: &mut CodeWriter, entry: &EnumEntry, flags: &str) {
    let slots = TypeSlots::new()
        .with("tp_name", format!("\"{}\"", unqualified(flags)))
        .with(
            "tp_as_number",
            format!("{}.tp_as_number", naming::type_object(&entry.qualified_name)),
        )
        .with("tp_flags", "Py_TPFLAGS_DEFAULT | Py_TPFLAGS_CHECKTYPES")
        .with("tp_base", "&PyInt_Type")
        .with("tp_new", "PyInt_Type.tp_new");
    emit_type_object(w, &naming::type_object(flags), "&PyType_Type", &slots);
}

/// Emit the flags operator functions and the number table pointing at them.
/// Does nothing for enums without flags.
pub fn emit_flags_methods(w: &mut CodeWriter, entry: &EnumEntry) {
    let Some(flags) = &entry.flags else {
        return;
    };
    for (method, op) in FLAGS_BINARY_OPERATORS {
        w.line(format!("PyObject* {}(PyObject* self, PyObject* arg)", flags_operator(entry, method)));
        w.block("", |w| {
            w.line(format!("return Shiboken::Converter< {flags} >::toPython("));
            w.indented(|w| {
                w.line(format!("Shiboken::Converter<{flags}>::toCpp(self)"));
                w.line(format!("{op} Shiboken::Converter< {flags} >::toCpp(arg)"));
            });
            w.line(");");
        });
        w.blank();
    }
    w.line(format!("PyObject* {}(PyObject* self, PyObject* arg)", flags_operator(entry, "__invert__")));
    w.block("", |w| {
        w.line(format!("return Shiboken::Converter< {flags} >::toPython("));
        w.indented(|w| w.line(format!("~Shiboken::Converter<{flags} >::toCpp(self)")));
        w.line(");");
    });
    w.blank();

    let mut slots = NumberSlots::default().with_function("__invert__", flags_operator(entry, "__invert__"));
    for (method, _) in FLAGS_BINARY_OPERATORS {
        slots = slots.with_function(*method, flags_operator(entry, method));
    }
    slots.emit(w, &entry.qualified_name);
}

// ==========================================================================
// Initialization
// ==========================================================================

/// Emit the module-init fragment readying the enum (and flags) type and
/// registering every enumerator in the enclosing scope.
pub fn emit_enum_initialization(w: &mut CodeWriter, entry: &EnumEntry) {
    let type_name = naming::type_object(&entry.qualified_name);
    let add_function = match entry.scope() {
        Some(scope) => format!("PyDict_SetItemString({}.super.ht_type.tp_dict,", naming::type_object(scope)),
        None => "PyModule_AddObject(module,".to_string(),
    };

    w.line(format!("// init enum: {}", entry.name));
    emit_ready_and_add(w, &entry.qualified_name, &entry.name, &add_function);
    if let Some(flags) = &entry.flags {
        w.line(format!("// init flags class: {}", unqualified(flags)));
        emit_ready_and_add(w, flags, unqualified(flags), &add_function);
    }

    for value in &entry.values {
        let native = match entry.scope() {
            Some(scope) => format!("(long) {scope}::{}", value.name),
            None => format!("(long) {}", value.name),
        };
        w.line(format!("enum_item = Shiboken::SbkEnumObject_New(&{type_name},"));
        w.indented(|w| w.line(format!("{native}, \"{}\");", value.name)));
        w.line(add_function.as_str());
        w.indented(|w| w.line(format!("\"{}\", enum_item);", value.name)));
        w.line(format!("PyDict_SetItemString({type_name}.tp_dict,"));
        w.indented(|w| w.line(format!("\"{}\", enum_item);", value.name)));
    }
    w.line(format!(
        "Shiboken::TypeResolver::createValueTypeResolver<int>(\"{}\");",
        entry.qualified_name
    ));
    w.blank();
}

fn emit_ready_and_add(w: &mut CodeWriter, qualified_name: &str, exposed_name: &str, add_function: &str) {
    let type_name = naming::type_object(qualified_name);
    w.line(format!("{} = &{type_name};", type_ext(qualified_name)));
    w.line(format!("if (PyType_Ready((PyTypeObject*)&{type_name}) < 0)"));
    w.indented(|w| w.line("return;"));
    w.line(format!("Py_INCREF(&{type_name});"));
    w.line(add_function);
    w.indented(|w| {
        w.indented(|w| w.line(format!("\"{exposed_name}\",((PyObject*)&{type_name}));")));
    });
    w.blank();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param_enum() -> EnumEntry {
        EnumEntry::new("ParamEnum", "Overload")
            .with_value("Param0", 0)
            .with_value("Param1", 1)
    }

    fn global_flags() -> EnumEntry {
        EnumEntry::new("GlobalEnum", "")
            .with_value("FirstThing", 1)
            .with_flags("GlobalFlags")
    }

    #[test]
    fn enum_type_is_an_integer_subtype() {
        let mut w = CodeWriter::new();
        emit_enum_definition(&mut w, &param_enum());
        let text = w.finish();
        assert!(text.starts_with(
            "static PyGetSetDef SbkOverload_ParamEnum_getsetlist[] = {\n    {const_cast<char*>(\"name\"), (getter)Shiboken::SbkEnumObject_name},\n"
        ));
        assert!(text.contains("static PyObject* SbkOverload_ParamEnum_New(PyTypeObject*, PyObject*, PyObject*);\n"));
        assert!(text.contains("static PyTypeObject SbkOverload_ParamEnum_Type = {\n    PyObject_HEAD_INIT(&Shiboken::SbkEnumType_Type)\n"));
        assert!(text.contains("    /*tp_name*/             \"ParamEnum\",\n"));
        assert!(text.contains("    /*tp_as_number*/        0,\n"));
        assert!(text.contains("    /*tp_base*/             &PyInt_Type,\n"));
        assert!(text.contains("    /*tp_new*/              SbkOverload_ParamEnum_New,\n"));
        assert!(text.contains("    if (!PyArg_ParseTuple(args, \"|i:__new__\", &item_value))\n        return 0;\n"));
        assert!(!text.contains("PyInt_Type.tp_new"));
    }

    #[test]
    fn flags_get_a_type_and_bitwise_slots() {
        let entry = global_flags();
        let mut w = CodeWriter::new();
        emit_enum_definition(&mut w, &entry);
        emit_flags_methods(&mut w, &entry);
        let text = w.finish();
        assert!(text.contains("    /*tp_as_number*/        &SbkGlobalEnum_as_number,\n"));
        assert!(text.contains("static PyTypeObject SbkGlobalFlags_Type = {\n    PyObject_HEAD_INIT(&PyType_Type)\n"));
        assert!(text.contains("    /*tp_as_number*/        SbkGlobalEnum_Type.tp_as_number,\n"));
        assert!(text.contains("    /*tp_new*/              PyInt_Type.tp_new,\n"));
        assert!(text.contains(
            "PyObject* SbkGlobalEnum___or__(PyObject* self, PyObject* arg)\n{\n    return Shiboken::Converter< GlobalFlags >::toPython(\n        Shiboken::Converter<GlobalFlags>::toCpp(self)\n        | Shiboken::Converter< GlobalFlags >::toCpp(arg)\n    );\n}\n"
        ));
        assert!(text.contains("        ~Shiboken::Converter<GlobalFlags >::toCpp(self)\n"));
        assert!(text.contains("    /*nb_invert*/               (unaryfunc)SbkGlobalEnum___invert__,\n"));
        assert!(text.contains("    /*nb_and*/                  (binaryfunc)SbkGlobalEnum___and__,\n"));
        assert!(text.contains("    /*nb_add*/                  0,\n"));
    }

    #[test]
    fn class_enums_register_in_the_class_dictionary() {
        let mut w = CodeWriter::new();
        emit_enum_initialization(&mut w, &param_enum());
        let text = w.finish();
        let expected_head = "\
// init enum: ParamEnum
SbkOverload_ParamEnum_TypeExt = &SbkOverload_ParamEnum_Type;
if (PyType_Ready((PyTypeObject*)&SbkOverload_ParamEnum_Type) < 0)
    return;
Py_INCREF(&SbkOverload_ParamEnum_Type);
PyDict_SetItemString(SbkOverload_Type.super.ht_type.tp_dict,
        \"ParamEnum\",((PyObject*)&SbkOverload_ParamEnum_Type));

enum_item = Shiboken::SbkEnumObject_New(&SbkOverload_ParamEnum_Type,
    (long) Overload::Param0, \"Param0\");
PyDict_SetItemString(SbkOverload_Type.super.ht_type.tp_dict,
    \"Param0\", enum_item);
PyDict_SetItemString(SbkOverload_ParamEnum_Type.tp_dict,
    \"Param0\", enum_item);
";
        assert!(text.starts_with(expected_head));
        assert!(text.ends_with("Shiboken::TypeResolver::createValueTypeResolver<int>(\"Overload::ParamEnum\");\n\n"));
    }

    #[test]
    fn global_enums_register_in_the_module() {
        let mut w = CodeWriter::new();
        emit_enum_initialization(&mut w, &global_flags());
        let text = w.finish();
        assert!(text.contains("// init flags class: GlobalFlags\nSbkGlobalFlags_TypeExt = &SbkGlobalFlags_Type;\n"));
        assert!(text.contains("PyModule_AddObject(module,\n        \"GlobalFlags\",((PyObject*)&SbkGlobalFlags_Type));\n"));
        assert!(text.contains("    (long) FirstThing, \"FirstThing\");\n"));
    }
}
