//! Type-object protocol slots of a wrapped class.
//!
//! Dispatchers for methods and operators come from [`crate::forward`]; this
//! module wires them into the tables the runtime looks at:
//!
//! - [`method_table`] - `PyMethodDef` entries with calling-convention flags
//! - [`number`] - `PyNumberMethods` from arithmetic and bitwise operators
//! - [`sequence`] - `PySequenceMethods` from added `__len__`-style functions
//! - [`richcompare`] - one dispatcher over the six comparison operators
//! - [`getset`] - getters and setters of public fields

pub mod getset;
pub mod method_table;
pub mod number;
pub mod richcompare;
pub mod sequence;

pub use getset::{emit_getset_table, emit_getter, emit_setter};
pub use method_table::{emit_method_table, emit_method_table_with, method_flags};
pub use number::{NumberSlots, emit_nonzero_function, has_bool_cast, is_number_slot};
pub use richcompare::emit_richcompare;
pub use sequence::{
    SEQUENCE_PROTOCOL, emit_sequence_functions, emit_sequence_table, is_sequence_method, sequence_functions,
};

use wrapgen_core::ClassEntry;

use crate::conversion::converter_spelling;
use crate::naming::CPP_SELF;
use crate::writer::CodeWriter;

/// `if (Shiboken::cppObjectIsInvalid(self)) return <error>;`
pub(crate) fn emit_invalid_check(w: &mut CodeWriter, object: &str, error_return: &str) {
    w.line(format!("if (Shiboken::cppObjectIsInvalid({object}))"));
    w.indented(|w| w.line(format!("return {error_return};")));
}

/// `Cls* cppSelf = Shiboken::Converter<Cls* >::toCpp(self);`
pub(crate) fn emit_self_definition(w: &mut CodeWriter, class: &ClassEntry) {
    let spelling = converter_spelling(&class.as_type());
    w.line(format!(
        "{}* {CPP_SELF} = Shiboken::Converter<{spelling} >::toCpp(self);",
        class.qualified_name
    ));
}
