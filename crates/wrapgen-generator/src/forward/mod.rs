//! Dispatchers forwarding dynamic calls to native functions.
//!
//! Every overload group becomes one dispatcher: constructors an `int`
//! returning init function, everything else a function returning the result
//! object. Both share the same middle section:
//!
//! ```text
//! arguments initializer      (overload::emit)
//! overload decisor           (overload::emit)
//! // Call function/method
//! {
//!     switch (overloadId) {
//!         case N: // signature
//!         {
//!             keyword resolution       (keywords)
//!             argument conversions     (conversion)
//!             if (!PyErr_Occurred()) {
//!                 native call          (call)
//!                 ownership steps      (ownership)
//!             }
//!             break;
//!         }
//!     }
//! }
//! error section              (overload::emit)
//! ```

mod call;
mod constructor;
mod keywords;
mod method;

pub use call::{call_arguments, call_expression, constructed_type, emit_method_call, scoped_default};
pub use constructor::emit_constructor_wrapper;
pub use keywords::{emit_named_argument_resolution, keyword_parameters};
pub use method::emit_method_wrapper;

use wrapgen_core::{ArgIndex, CodeLanguage, FunctionEntry, GenerationError};
use wrapgen_registry::OverloadGroup;

use crate::GeneratorContext;
use crate::conversion::ArgumentConversion;
use crate::naming::{self, PY_RESULT, THREAD_STATE_SAVER};
use crate::overload::OverloadDecisor;
use crate::writer::CodeWriter;

/// The dispatcher produces a result object (not `None`, not `self`).
pub fn group_returns_value(group: &OverloadGroup) -> bool {
    !group.is_constructor() && group.has_non_void_return() && !is_inplace_group(group)
}

/// In-place operators return the receiver.
pub fn is_inplace_group(group: &OverloadGroup) -> bool {
    group
        .reference()
        .and_then(FunctionEntry::operator_kind)
        .is_some_and(|op| op.is_inplace())
}

/// The return value is hidden by a customization rule.
fn return_removed(function: &FunctionEntry) -> bool {
    function
        .modification
        .argument(ArgIndex::Return)
        .is_some_and(|m| m.removed)
}

/// Conversions for every dynamic-visible argument of `function`.
pub fn argument_conversions(
    ctx: &GeneratorContext<'_>,
    decisor: &OverloadDecisor<'_>,
    function: &FunctionEntry,
) -> Vec<ArgumentConversion> {
    function
        .visible_arguments()
        .enumerate()
        .map(|(dynamic, (native, _))| {
            ArgumentConversion::derive(ctx, function, native, dynamic, decisor.argument_source(dynamic))
        })
        .collect()
}

/// The `// Call function/method` block dispatching on `overloadId`.
pub fn emit_function_calls(
    ctx: &GeneratorContext<'_>,
    w: &mut CodeWriter,
    decisor: &OverloadDecisor<'_>,
    error_return: &str,
) -> Result<(), GenerationError> {
    let group = decisor.group();
    w.line("// Call function/method");
    w.line("{");
    w.indent();
    if group.allows_thread() {
        w.line(format!("Shiboken::ThreadStateSaver {THREAD_STATE_SAVER};"));
        w.blank();
    }
    let outcome = if group.len() == 1 {
        emit_single_call(ctx, w, decisor, 0, error_return)
    } else {
        emit_call_switch(ctx, w, decisor, error_return)
    };
    w.dedent();
    w.line("}");
    outcome
}

fn emit_call_switch(
    ctx: &GeneratorContext<'_>,
    w: &mut CodeWriter,
    decisor: &OverloadDecisor<'_>,
    error_return: &str,
) -> Result<(), GenerationError> {
    w.line("switch (overloadId) {");
    w.indent();
    for (index, function) in decisor.group().functions.iter().enumerate() {
        w.line(format!("case {index}: // {}", function.minimal_signature()));
        w.line("{");
        w.indent();
        let outcome = emit_single_call(ctx, w, decisor, index, error_return);
        w.line("break;");
        w.dedent();
        w.line("}");
        outcome?;
    }
    w.dedent();
    w.line("}");
    Ok(())
}

/// Everything needed to invoke one candidate once it was selected.
pub fn emit_single_call(
    ctx: &GeneratorContext<'_>,
    w: &mut CodeWriter,
    decisor: &OverloadDecisor<'_>,
    index: usize,
    error_return: &str,
) -> Result<(), GenerationError> {
    let function = decisor.function(index);
    if function.is_private() {
        let signature = function.signature().replace("::", ".");
        w.line(format!(
            "PyErr_Format(PyExc_TypeError, \"%s is a private method.\", \"{signature}\");"
        ));
        w.line(format!("return {error_return};"));
        return Ok(());
    }

    let uses_argument_list = decisor.uses_argument_list();
    if decisor.uses_named_arguments() && !decisor.is_reflected_constructor() {
        let full_name = naming::full_function_name(function, ctx.module());
        keywords::emit_named_argument_resolution(w, function, uses_argument_list, &full_name, error_return);
    }

    let conversions = argument_conversions(ctx, decisor, function);
    for conversion in &conversions {
        let index = ArgIndex::Arg(conversion.position + 1);
        if function.conversion_rule(CodeLanguage::Native, index).is_none() {
            conversion.emit(w, error_return);
        }
    }
    if conversions.iter().any(ArgumentConversion::is_converted) {
        w.blank();
    }

    let mut outcome = Ok(());
    w.block("if (!PyErr_Occurred())", |w| {
        outcome = call::emit_method_call(ctx, w, function, &conversions, uses_argument_list, error_return);
        if group_returns_value(decisor.group()) && (function.returns_void() || return_removed(function)) {
            w.line(format!("{PY_RESULT} = Py_None;"));
            w.line("Py_INCREF(Py_None);");
        }
    });
    outcome
}
