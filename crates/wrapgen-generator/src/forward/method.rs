//! Method and module function dispatchers.

use wrapgen_core::GenerationError;

use super::{emit_function_calls, group_returns_value, is_inplace_group};
use crate::GeneratorContext;
use crate::conversion::converter_spelling;
use crate::naming::{self, CPP_SELF, PY_RESULT};
use crate::overload::OverloadDecisor;
use crate::writer::CodeWriter;

/// Parameter list of a non-constructor dispatcher.
pub(crate) fn dispatcher_parameters(decisor: &OverloadDecisor<'_>) -> &'static str {
    if decisor.max_args() == 0 {
        "PyObject* self"
    } else if !decisor.uses_argument_list() {
        "PyObject* self, PyObject* arg"
    } else if decisor.uses_named_arguments() {
        "PyObject* self, PyObject* args, PyObject* kwds"
    } else {
        "PyObject* self, PyObject* args"
    }
}

/// Emit `static PyObject* <dispatcher>(...)` for a method or module function group.
#[tracing::instrument(level = "debug", skip_all, fields(group = %decisor.group().name))]
pub fn emit_method_wrapper(
    ctx: &GeneratorContext<'_>,
    w: &mut CodeWriter,
    decisor: &OverloadDecisor<'_>,
) -> Result<(), GenerationError> {
    let name = naming::group_function(decisor.group(), ctx.module());
    let mut outcome = Ok(());
    w.block(format!("static PyObject* {name}({})", dispatcher_parameters(decisor)), |w| {
        outcome = emit_body(ctx, w, decisor, &name);
    });
    w.blank();
    outcome
}

fn emit_body(
    ctx: &GeneratorContext<'_>,
    w: &mut CodeWriter,
    decisor: &OverloadDecisor<'_>,
    name: &str,
) -> Result<(), GenerationError> {
    let group = decisor.group();
    let reference = decisor.reference();
    let full_name = naming::full_function_name(reference, ctx.module());
    let error_label = format!("{name}_TypeError");
    let max = decisor.max_args();
    let returns_value = group_returns_value(group);
    let binary_operator = reference.is_operator_overload() && reference.operand_count() == 1;

    let class = group.scope.as_deref().and_then(|scope| ctx.class(scope));
    let has_instance_members = group.instance_members().next().is_some();
    if let Some(class) = class.filter(|c| !c.is_namespace() && has_instance_members) {
        let qualified = &class.qualified_name;
        w.line(format!("{qualified}* {CPP_SELF} = 0;"));

        if binary_operator {
            let check = naming::check_function(qualified);
            w.line(format!("bool isReverse = {check}(arg) && !{check}(self);"));
            w.line("if (isReverse)");
            w.indented(|w| w.line("std::swap(self, arg);"));
            w.blank();
        }

        let emit_self = |w: &mut CodeWriter| {
            w.line("if (Shiboken::cppObjectIsInvalid(self))");
            w.indented(|w| w.line("return 0;"));
            w.line(format!(
                "{CPP_SELF} = Shiboken::Converter<{} >::toCpp(self);",
                converter_spelling(&class.as_type())
            ));
        };
        if group.static_members().next().is_some() {
            w.block("if (self)", emit_self);
        } else {
            emit_self(w);
        }
        w.blank();
    }

    if returns_value {
        w.line(format!("PyObject* {PY_RESULT} = 0;"));
    }
    if max > 0 {
        w.line("int overloadId = -1;");
    }
    if decisor.uses_named_arguments() {
        w.line("int numNamedArgs = (kwds ? PyDict_Size(kwds) : 0);");
    }
    w.blank();

    if max > 0 && decisor.uses_argument_list() {
        decisor.emit_arguments_initializer(w, &group.name, &full_name, &error_label, "0");
    }

    let reverse_name = reference
        .operator_kind()
        .filter(|_| binary_operator && returns_value && !reference.is_reverse_operator())
        .and_then(|op| op.reverse_dynamic_name());
    let mut outcome = Ok(());
    let mut dispatch = |w: &mut CodeWriter| {
        if max > 0 {
            decisor.emit_decisor(w, &error_label);
        }
        outcome = emit_function_calls(ctx, w, decisor, "0");
    };
    match reverse_name {
        Some(reverse) => {
            emit_reverse_probe(w, reverse);
            w.line("// Do not enter here if other object has implemented a reverse operator.");
            w.block(format!("if (!{PY_RESULT})"), dispatch);
        }
        None => dispatch(w),
    }
    outcome?;
    w.blank();

    if returns_value {
        w.block(format!("if (PyErr_Occurred() || !{PY_RESULT})"), |w| {
            w.line(format!("Py_XDECREF({PY_RESULT});"));
            w.line("return 0;");
        });
        w.line(format!("return {PY_RESULT};"));
    } else {
        w.line("if (PyErr_Occurred())");
        w.indented(|w| w.line("return 0;"));
        if is_inplace_group(group) {
            w.line("Py_INCREF(self);");
            w.line("return self;");
        } else {
            w.line("Py_RETURN_NONE;");
        }
    }

    if max > 0 {
        w.blank();
        decisor.emit_error_section(w, &error_label, &full_name, ctx.options.verbose_error_messages, "0");
    }
    Ok(())
}

/// Give the other operand's reverse operator the first chance.
fn emit_reverse_probe(w: &mut CodeWriter, reverse: &str) {
    w.line("if (!isReverse");
    w.indented(|w| {
        w.line("&& SbkBaseWrapper_Check(arg)");
        w.line("&& !PyObject_TypeCheck(arg, self->ob_type)");
        w.line(format!("&& PyObject_HasAttrString(arg, const_cast<char*>(\"{reverse}\"))) {{"));
        w.line(format!(
            "PyObject* revOpMethod = PyObject_GetAttrString(arg, const_cast<char*>(\"{reverse}\"));"
        ));
        w.block("if (revOpMethod && PyCallable_Check(revOpMethod))", |w| {
            w.line(format!(
                "{PY_RESULT} = PyObject_CallFunction(revOpMethod, const_cast<char*>(\"O\"), self);"
            ));
            w.block(
                "if (PyErr_Occurred() && (PyErr_ExceptionMatches(PyExc_NotImplementedError) || PyErr_ExceptionMatches(PyExc_AttributeError)))",
                |w| {
                    w.line("PyErr_Clear();");
                    w.line(format!("Py_XDECREF({PY_RESULT});"));
                    w.line(format!("{PY_RESULT} = 0;"));
                },
            );
        });
        w.line("Py_XDECREF(revOpMethod);");
        w.blank();
    });
    w.line("}");
}
