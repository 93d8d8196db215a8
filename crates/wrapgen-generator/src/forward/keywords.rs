//! Keyword argument resolution.
//!
//! Only parameters with default values may be passed by keyword. A keyword
//! filling a slot that a positional argument already filled is an error, raised
//! before any conversion so nothing has happened yet.

use wrapgen_core::FunctionEntry;

use crate::writer::CodeWriter;

/// Dynamic position and name of each keyword-capable parameter.
pub fn keyword_parameters(function: &FunctionEntry) -> Vec<(usize, &str)> {
    function
        .visible_arguments()
        .enumerate()
        .filter(|(_, (native, _))| function.default_value(*native).is_some())
        .filter_map(|(dynamic, (native, _))| Some((dynamic, function.argument_name(native)?)))
        .collect()
}

/// Move `kwds` entries into the positional slots of `function`.
pub fn emit_named_argument_resolution(
    w: &mut CodeWriter,
    function: &FunctionEntry,
    uses_argument_list: bool,
    full_name: &str,
    error_return: &str,
) {
    let parameters = keyword_parameters(function);
    if parameters.is_empty() {
        return;
    }
    w.block("if (kwds)", |w| {
        w.line("const char* errorArgName = 0;");
        for (i, (position, name)) in parameters.iter().enumerate() {
            let slot = if uses_argument_list {
                format!("pyargs[{position}]")
            } else {
                "arg".to_string()
            };
            let declaration = if i == 0 { "PyObject* " } else { "" };
            w.line(format!("{declaration}value = PyDict_GetItemString(kwds, \"{name}\");"));
            w.block("if (value)", |w| {
                w.line(format!("if ({slot})"));
                w.indented(|w| w.line(format!("errorArgName = \"{name}\";")));
                w.line("else");
                w.indented(|w| w.line(format!("{slot} = value;")));
            });
        }
        w.block("if (errorArgName)", |w| {
            w.line(format!(
                "PyErr_Format(PyExc_TypeError, \"{full_name}(): got multiple values for keyword argument '%s'\", errorArgName);"
            ));
            w.line(format!("return {error_return};"));
        });
    });
}
