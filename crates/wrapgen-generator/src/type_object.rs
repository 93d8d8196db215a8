//! `PyTypeObject` slot layout shared by class, enum and flags definitions.
//!
//! Slots are emitted positionally in structure order with a `/*slot*/` label;
//! any slot not set explicitly is `0`.

use rustc_hash::FxHashMap;

use crate::writer::CodeWriter;

/// Slots of `PyTypeObject` after the object header, in structure order.
pub const TYPE_SLOTS: &[&str] = &[
    "ob_size",
    "tp_name",
    "tp_basicsize",
    "tp_itemsize",
    "tp_dealloc",
    "tp_print",
    "tp_getattr",
    "tp_setattr",
    "tp_compare",
    "tp_repr",
    "tp_as_number",
    "tp_as_sequence",
    "tp_as_mapping",
    "tp_hash",
    "tp_call",
    "tp_str",
    "tp_getattro",
    "tp_setattro",
    "tp_as_buffer",
    "tp_flags",
    "tp_doc",
    "tp_traverse",
    "tp_clear",
    "tp_richcompare",
    "tp_weaklistoffset",
    "tp_iter",
    "tp_iternext",
    "tp_methods",
    "tp_members",
    "tp_getset",
    "tp_base",
    "tp_dict",
    "tp_descr_get",
    "tp_descr_set",
    "tp_dictoffset",
    "tp_init",
    "tp_alloc",
    "tp_new",
    "tp_free",
    "tp_is_gc",
    "tp_bases",
    "tp_mro",
    "tp_cache",
    "tp_subclasses",
    "tp_weaklist",
];

/// Column where slot values start.
const LABEL_WIDTH: usize = 24;

/// `/*slot*/ value,` padded to the common value column.
pub fn slot_line(slot: &str, value: &str, last: bool) -> String {
    let label = format!("/*{slot}*/");
    let separator = if last { "" } else { "," };
    format!("{label:<LABEL_WIDTH$}{value}{separator}")
}

/// Values for the non-zero slots of one type object.
#[derive(Debug, Default, Clone)]
pub struct TypeSlots {
    values: FxHashMap<&'static str, String>,
}

impl TypeSlots {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Builder Methods
    // ==========================================================================

    pub fn with(mut self, slot: &'static str, value: impl Into<String>) -> Self {
        self.set(slot, value);
        self
    }

    /// Set a slot; `0` clears it.
    pub fn set(&mut self, slot: &'static str, value: impl Into<String>) {
        let value = value.into();
        if value == "0" {
            self.values.remove(slot);
        } else {
            self.values.insert(slot, value);
        }
    }

    pub fn get(&self, slot: &str) -> &str {
        self.values.get(slot).map(String::as_str).unwrap_or("0")
    }

    /// Write every slot. The last one is followed by a comma only when the
    /// structure continues (`trailing`).
    pub fn emit(&self, w: &mut CodeWriter, trailing: bool) {
        let last = TYPE_SLOTS.len() - 1;
        for (i, slot) in TYPE_SLOTS.iter().enumerate() {
            w.line(slot_line(slot, self.get(slot), i == last && !trailing));
        }
    }
}

/// `static PyTypeObject <name> = { PyObject_HEAD_INIT(<meta>) ... };`.
pub fn emit_type_object(w: &mut CodeWriter, name: &str, meta_type: &str, slots: &TypeSlots) {
    w.block_with(format!("static PyTypeObject {name} ="), "};", |w| {
        w.line(format!("PyObject_HEAD_INIT({meta_type})"));
        slots.emit(w, false);
    });
    w.blank();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_align_values() {
        assert_eq!(slot_line("ob_size", "0", false), "/*ob_size*/             0,");
        assert_eq!(slot_line("tp_weaklistoffset", "0", false), "/*tp_weaklistoffset*/   0,");
        assert_eq!(slot_line("tp_weaklist", "0", true), "/*tp_weaklist*/         0");
    }

    #[test]
    fn unset_slots_are_zero() {
        let slots = TypeSlots::new()
            .with("tp_name", "\"Point\"")
            .with("tp_flags", "Py_TPFLAGS_DEFAULT")
            .with("tp_repr", "0");
        assert_eq!(slots.get("tp_name"), "\"Point\"");
        assert_eq!(slots.get("tp_repr"), "0");

        let mut w = CodeWriter::new();
        emit_type_object(&mut w, "SbkPoint_Type", "&PyType_Type", &slots);
        let text = w.finish();
        assert!(text.starts_with("static PyTypeObject SbkPoint_Type = {\n    PyObject_HEAD_INIT(&PyType_Type)\n"));
        assert!(text.contains("    /*tp_name*/             \"Point\",\n"));
        assert!(text.contains("    /*tp_flags*/            Py_TPFLAGS_DEFAULT,\n"));
        assert!(text.ends_with("    /*tp_weaklist*/         0\n};\n\n"));
        assert_eq!(text.lines().count(), TYPE_SLOTS.len() + 4);
    }
}
