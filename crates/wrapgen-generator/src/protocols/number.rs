//! Number protocol (`PyNumberMethods`).
//!
//! Slots are filled from operator dispatchers by protocol name; everything
//! else is `0`. `nb_nonzero` comes from a native `operator bool`.

use rustc_hash::FxHashMap;
use wrapgen_core::{ClassEntry, FunctionKind, PrimitiveKind, TypeCategory};
use wrapgen_registry::{GroupKind, OverloadGroup};

use super::{emit_invalid_check, emit_self_definition};
use crate::naming::{self, CPP_SELF};
use crate::writer::CodeWriter;

/// Slot name, function cast and protocol method, in structure order.
const NUMBER_SLOTS: &[(&str, &str, &str)] = &[
    ("nb_add", "binaryfunc", "__add__"),
    ("nb_subtract", "binaryfunc", "__sub__"),
    ("nb_multiply", "binaryfunc", "__mul__"),
    ("nb_divide", "binaryfunc", "__div__"),
    ("nb_remainder", "binaryfunc", "__mod__"),
    ("nb_divmod", "", ""),
    ("nb_power", "", ""),
    ("nb_negative", "unaryfunc", "__neg__"),
    ("nb_positive", "unaryfunc", "__pos__"),
    ("nb_absolute", "", ""),
    ("nb_nonzero", "inquiry", "__nonzero__"),
    ("nb_invert", "unaryfunc", "__invert__"),
    ("nb_lshift", "binaryfunc", "__lshift__"),
    ("nb_rshift", "binaryfunc", "__rshift__"),
    ("nb_and", "binaryfunc", "__and__"),
    ("nb_xor", "binaryfunc", "__xor__"),
    ("nb_or", "binaryfunc", "__or__"),
    ("nb_coerce", "", ""),
    ("nb_int", "", ""),
    ("nb_long", "", ""),
    ("nb_float", "", ""),
    ("nb_oct", "", ""),
    ("nb_hex", "", ""),
    ("nb_inplace_add", "binaryfunc", "__iadd__"),
    ("nb_inplace_subtract", "binaryfunc", "__isub__"),
    ("nb_inplace_multiply", "binaryfunc", "__imul__"),
    ("nb_inplace_divide", "binaryfunc", "__idiv__"),
    ("nb_inplace_remainder", "binaryfunc", "__imod__"),
    ("nb_inplace_power", "", ""),
    ("nb_inplace_lshift", "binaryfunc", "__ilshift__"),
    ("nb_inplace_rshift", "binaryfunc", "__irshift__"),
    ("nb_inplace_and", "binaryfunc", "__iand__"),
    ("nb_inplace_xor", "binaryfunc", "__ixor__"),
    ("nb_inplace_or", "binaryfunc", "__ior__"),
    ("nb_floor_divide", "", ""),
    ("nb_true_divide", "", ""),
    ("nb_inplace_floor_divide", "", ""),
    ("nb_inplace_true_divide", "", ""),
    ("nb_index", "", ""),
];

/// Whether `name` is served by a number slot rather than the method table.
pub fn is_number_slot(name: &str) -> bool {
    NUMBER_SLOTS.iter().any(|(_, _, method)| !method.is_empty() && *method == name)
}

/// The native class converts to `bool`.
pub fn has_bool_cast(class: &ClassEntry) -> bool {
    class.functions.iter().any(|f| {
        f.kind == FunctionKind::Conversion
            && !f.is_private()
            && f.return_type.category == TypeCategory::Primitive(PrimitiveKind::Bool)
    })
}

/// Number slots of one class, keyed by protocol method name.
#[derive(Debug, Default)]
pub struct NumberSlots {
    functions: FxHashMap<&'static str, String>,
}

impl NumberSlots {
    /// Collect slot functions from the class's operator groups.
    pub fn collect(class: &ClassEntry, groups: &[OverloadGroup], module: &str) -> Self {
        let mut functions = FxHashMap::default();
        for group in groups.iter().filter(|g| g.kind == GroupKind::NumberOperator) {
            if let Some((_, _, method)) = NUMBER_SLOTS.iter().find(|(_, _, m)| *m == group.name) {
                if *method != "__nonzero__" {
                    functions.insert(*method, naming::group_function(group, module));
                }
            }
        }
        if has_bool_cast(class) {
            functions.insert("__nonzero__", nonzero_function(&class.qualified_name));
        }
        Self { functions }
    }

    /// Fill the slot served by protocol method `method`.
    pub fn with_function(mut self, method: &'static str, function: impl Into<String>) -> Self {
        self.functions.insert(method, function.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn function(&self, method: &str) -> Option<&str> {
        self.functions.get(method).map(String::as_str)
    }

    /// Emit `static PyNumberMethods <Cls>_as_number = { ... };`.
    pub fn emit(&self, w: &mut CodeWriter, class_name: &str) {
        let width = NUMBER_SLOTS.iter().map(|(slot, _, _)| slot.len()).max().unwrap_or(0) + 5;
        w.block_with(format!("static PyNumberMethods {} =", naming::number_table(class_name)), "};", |w| {
            let last = NUMBER_SLOTS.len() - 1;
            for (i, (slot, cast, method)) in NUMBER_SLOTS.iter().enumerate() {
                let label = format!("/*{slot}*/");
                let value = match self.functions.get(method) {
                    Some(function) => format!("({cast}){function}"),
                    None => "0".to_string(),
                };
                let separator = if i == last { "" } else { "," };
                w.line(format!("{label:<width$}{value}{separator}"));
            }
        });
        w.blank();
    }
}

pub fn nonzero_function(class_name: &str) -> String {
    format!("{}___nonzero__", naming::base_name(class_name))
}

/// `static int <Cls>___nonzero__(PyObject* self)` through `operator bool`.
pub fn emit_nonzero_function(w: &mut CodeWriter, class: &ClassEntry) {
    w.line(format!("static int {}(PyObject* self)", nonzero_function(&class.qualified_name)));
    w.block("", |w| {
        emit_invalid_check(w, "self", "-1");
        emit_self_definition(w, class);
        w.line(format!("return (bool) *{CPP_SELF} ? 1 : 0;"));
    });
    w.blank();
}
