//! Signal registration for reflected classes.
//!
//! Signals declared by a class are grouped by name; each name becomes one
//! signal object in the type's dictionary carrying every overload's
//! normalized signature.

use wrapgen_core::{ClassEntry, normalize_signature};

use crate::naming;
use crate::writer::CodeWriter;

/// Signal names with their normalized signatures, in declaration order.
pub fn class_signals(class: &ClassEntry) -> Vec<(String, Vec<String>)> {
    let mut result: Vec<(String, Vec<String>)> = Vec::new();
    let declared = class
        .signals()
        .filter(|f| f.declaring_class.as_deref().is_none_or(|d| d == class.qualified_name));
    for signal in declared {
        let params = if signal.arguments.is_empty() {
            "void".to_string()
        } else {
            signal
                .arguments
                .iter()
                .map(|a| a.ty.unqualified().cpp_signature().replace('*', "").trim().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        let signature = normalize_signature(&format!("{}({params})", signal.name));
        // Only the parameter list is passed to the runtime.
        let params = signature
            .strip_prefix(signal.name.as_str())
            .and_then(|s| s.strip_prefix('('))
            .and_then(|s| s.strip_suffix(')'))
            .unwrap_or_default()
            .to_string();
        match result.iter_mut().find(|(name, _)| *name == signal.name) {
            Some((_, signatures)) => signatures.push(params),
            None => result.push((signal.name.clone(), vec![params])),
        }
    }
    result
}

/// Emit the class-init fragment creating the signal objects. Nothing is
/// written for classes without signals of their own.
#[tracing::instrument(level = "debug", skip_all, fields(class = %class.qualified_name))]
pub fn emit_signal_initialization(w: &mut CodeWriter, class: &ClassEntry) {
    let signals = class_signals(class);
    if signals.is_empty() {
        return;
    }
    let type_name = naming::type_object(&class.qualified_name);
    w.line("// Initialize signals");
    w.line("PyObject* signal_item;");
    w.blank();
    for (name, signatures) in &signals {
        let mut call = format!("signal_item = PySide::signalNew(\"{name}\"");
        for signature in signatures {
            call.push_str(&format!(", \"{signature}\""));
        }
        call.push_str(", NULL);");
        w.line(call);
        w.line(format!(
            "PyDict_SetItemString({type_name}.super.ht_type.tp_dict, \"{name}\", signal_item);"
        ));
        w.line("Py_DECREF(signal_item);");
    }
    w.blank();
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrapgen_core::{ArgumentEntry, ClassFlags, CppType, FunctionEntry, FunctionKind, PrimitiveKind};

    fn signal(name: &str) -> FunctionEntry {
        FunctionEntry::new(name, FunctionKind::Signal, CppType::void())
    }

    fn emitter() -> ClassEntry {
        ClassEntry::object("Emitter")
            .with_flags(ClassFlags::QOBJECT)
            .with_function(signal("destroyed"))
            .with_function(
                signal("moved")
                    .with_arg(ArgumentEntry::new("p", CppType::value("Point").const_ref())),
            )
            .with_function(
                signal("moved").with_arg(ArgumentEntry::new("x", CppType::primitive(PrimitiveKind::Int))),
            )
    }

    #[test]
    fn overloads_share_one_signal_object() {
        let signals = class_signals(&emitter());
        assert_eq!(
            signals,
            vec![
                ("destroyed".to_string(), vec!["void".to_string()]),
                ("moved".to_string(), vec!["Point".to_string(), "int".to_string()]),
            ]
        );
    }

    #[test]
    fn signals_are_stored_in_the_type_dictionary() {
        let mut w = CodeWriter::new();
        emit_signal_initialization(&mut w, &emitter());
        let expected = "\
// Initialize signals
PyObject* signal_item;

signal_item = PySide::signalNew(\"destroyed\", \"void\", NULL);
PyDict_SetItemString(SbkEmitter_Type.super.ht_type.tp_dict, \"destroyed\", signal_item);
Py_DECREF(signal_item);
signal_item = PySide::signalNew(\"moved\", \"Point\", \"int\", NULL);
PyDict_SetItemString(SbkEmitter_Type.super.ht_type.tp_dict, \"moved\", signal_item);
Py_DECREF(signal_item);

";
        assert_eq!(w.finish(), expected);
    }

    #[test]
    fn inherited_signals_are_not_registered_again() {
        let mut inherited = signal("destroyed");
        inherited.declaring_class = Some("Base".into());
        let class = ClassEntry::object("Derived").with_function(inherited);
        let mut w = CodeWriter::new();
        emit_signal_initialization(&mut w, &class);
        assert!(w.is_empty());
    }
}
