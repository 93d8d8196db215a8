//! The native invocation of one candidate.
//!
//! Builds the argument list passed to native code (converted arguments,
//! defaults standing in for removed ones, conversion-rule outputs) and the
//! call expression for the candidate's kind, then emits the call with its
//! result conversion, lock release, injected code and ownership steps.

use wrapgen_core::{
    ArgIndex, CodeLanguage, FunctionEntry, GenerationError, SnipPosition, TypeCategory,
};

use crate::GeneratorContext;
use crate::conversion::{ArgumentConversion, to_python};
use crate::naming::{self, CPP_RESULT, CPP_SELF, PY_RESULT, THREAD_STATE_SAVER};
use crate::ownership::OwnershipLinker;
use crate::writer::CodeWriter;

/// Default value expression qualified for use outside its scope.
///
/// Enumerator defaults of scoped enums (`Param0`) become `Overload::Param0`.
pub fn scoped_default(ctx: &GeneratorContext<'_>, function: &FunctionEntry, position: usize) -> Option<String> {
    let value = function.default_value(position)?;
    let ty = &function.arguments.get(position)?.ty;
    if matches!(ty.category, TypeCategory::Enum | TypeCategory::Flags) && !value.contains("::") {
        let scope = ctx
            .registry
            .enum_entry(&ty.name)
            .and_then(|e| e.scope().map(str::to_string))
            .or_else(|| ty.name.rsplit_once("::").map(|(scope, _)| scope.to_string()));
        if let Some(scope) = scope {
            return Some(format!("{scope}::{value}"));
        }
    }
    Some(value.to_string())
}

fn has_native_rule(function: &FunctionEntry, position: usize) -> bool {
    function
        .conversion_rule(CodeLanguage::Native, ArgIndex::Arg(position + 1))
        .is_some()
}

/// Expressions passed to the native function, in native order.
///
/// Fails when a removed argument has neither a default value nor a native
/// conversion rule.
pub fn call_arguments(
    ctx: &GeneratorContext<'_>,
    function: &FunctionEntry,
    conversions: &[ArgumentConversion],
) -> Result<Vec<String>, GenerationError> {
    let bad = || GenerationError::RemovedArgumentWithoutValue {
        class: function.owner.clone().unwrap_or_else(|| ctx.module().to_string()),
        signature: function.minimal_signature(),
    };
    let mut args = Vec::with_capacity(function.arguments.len());
    for (position, arg) in function.arguments.iter().enumerate() {
        if has_native_rule(function, position) {
            args.push(format!("{}_out", arg.name));
        } else if function.argument_removed(position) {
            args.push(scoped_default(ctx, function, position).ok_or_else(bad)?);
        } else {
            let dynamic = position - function.removed_arguments_before(position);
            let conversion = conversions.iter().find(|c| c.position == position);
            args.push(conversion.map_or_else(|| format!("cpp_arg{dynamic}"), ArgumentConversion::call_expression));
        }
    }

    // Trailing removed arguments with untouched defaults may be omitted.
    while let Some(position) = args.len().checked_sub(1) {
        let omittable = function.argument_removed(position)
            && !has_native_rule(function, position)
            && !function.default_value_modified(position)
            && function.arguments[position].default_value.is_some();
        if !omittable {
            break;
        }
        args.pop();
    }
    Ok(args)
}

/// Type instantiated by constructors of `class_name`: the trampoline
/// subclass when one is generated.
pub fn constructed_type(ctx: &GeneratorContext<'_>, class_name: &str) -> String {
    match ctx.class(class_name) {
        Some(class) if class.needs_native_wrapper() => naming::wrapper_class(class_name),
        _ => class_name.to_string(),
    }
}

/// The native call expression, without the result assignment.
pub fn call_expression(ctx: &GeneratorContext<'_>, function: &FunctionEntry, args: &[String]) -> String {
    if let Some(op) = function.operator_kind() {
        let symbol = op.cpp_symbol();
        let receiver = format!("(*{CPP_SELF})");
        return match args.first() {
            None => format!("{symbol} {receiver}"),
            Some(operand) => {
                let operand = if operand.starts_with('*') {
                    format!("({operand})")
                } else {
                    operand.clone()
                };
                if function.is_reverse_operator() {
                    format!("{operand} {symbol} {receiver}")
                } else {
                    format!("{receiver} {symbol} {operand}")
                }
            }
        };
    }

    let joined = args.join(", ");
    if function.is_constructor() {
        let owner = function.owner.as_deref().unwrap_or(&function.name);
        let constructed = constructed_type(ctx, owner);
        if function.is_copy_constructor() && args.len() == 1 {
            let source = args[0].trim_start_matches('*');
            return format!("new {constructed}(*reinterpret_cast<{constructed}*>({source}))");
        }
        return format!("new {constructed}({joined})");
    }

    match function.owner.as_deref() {
        None => format!("{}({joined})", function.name),
        Some(owner) => {
            let protected = ctx.options.avoid_protected_hack && function.is_protected();
            let mut call = String::new();
            if !function.is_static() {
                if protected {
                    call.push_str(&format!("(({}*) {CPP_SELF})->", naming::wrapper_class(owner)));
                } else {
                    call.push_str(&format!("{CPP_SELF}->"));
                }
            }
            if !function.is_abstract() {
                let scope = if protected { naming::wrapper_class(owner) } else { owner.to_string() };
                call.push_str(&format!("{scope}::"));
            }
            call.push_str(&function.name);
            if protected {
                call.push_str("_protected");
            }
            format!("{call}({joined})")
        }
    }
}

/// Emit the invocation of `function` inside its `case` of the dispatcher.
pub fn emit_method_call(
    ctx: &GeneratorContext<'_>,
    w: &mut CodeWriter,
    function: &FunctionEntry,
    conversions: &[ArgumentConversion],
    uses_argument_list: bool,
    error_return: &str,
) -> Result<(), GenerationError> {
    let reverse = if function.is_reverse_operator() { " [reverse operator]" } else { "" };
    w.line(format!("// {}{reverse}", function.minimal_signature()));

    if function.is_abstract() {
        let owner = function.owner.as_deref().map(naming::dotted).unwrap_or_default();
        w.block("if (SbkBaseWrapper_containsCppWrapper(self))", |w| {
            w.line(format!(
                "PyErr_SetString(PyExc_NotImplementedError, \"pure virtual method '{owner}.{}()' not implemented.\");",
                function.name
            ));
            w.line(format!("return {error_return};"));
        });
    }

    if function.allows_thread() {
        w.line(format!("{THREAD_STATE_SAVER}.save();"));
    }

    let beginning: Vec<_> = function.snips(SnipPosition::Beginning, CodeLanguage::Dynamic).collect();
    for snip in &beginning {
        w.code(&snip.code);
    }
    if !beginning.is_empty() {
        w.blank();
    }

    for (position, arg) in function.arguments.iter().enumerate() {
        if let Some(rule) = function.conversion_rule(CodeLanguage::Native, ArgIndex::Arg(position + 1)) {
            let source = conversions
                .iter()
                .find(|c| c.position == position)
                .map_or_else(|| format!("cpp_arg{position}"), |c| c.source.clone());
            w.code(&rule.expand(&source, &arg.name));
        }
    }

    let replaced = function.replaces_native_call();
    if replaced {
        for snip in function.snips(SnipPosition::Replace, CodeLanguage::Dynamic) {
            w.code(&snip.code);
        }
    } else {
        let args = call_arguments(ctx, function, conversions)?;
        let call = call_expression(ctx, function, &args);
        let inplace = function.operator_kind().is_some_and(|op| op.is_inplace());
        if function.is_constructor() {
            w.line(format!("cptr = {call};"));
        } else if !function.returns_void() && !inplace {
            w.line(format!("{} {CPP_RESULT} = {call};", function.return_type.cpp_signature()));
        } else {
            w.line(format!("{call};"));
        }
    }

    if function.allows_thread() {
        w.line(format!("{THREAD_STATE_SAVER}.restore();"));
    }

    let inplace = function.operator_kind().is_some_and(|op| op.is_inplace());
    if !replaced && !function.is_constructor() && !function.returns_void() && !inplace {
        w.line(format!("{PY_RESULT} = {};", to_python(&function.return_type, CPP_RESULT)));
    }

    if !function.is_constructor() {
        let end: Vec<_> = function.snips(SnipPosition::End, CodeLanguage::Dynamic).collect();
        if !end.is_empty() {
            w.blank();
        }
        for snip in end {
            w.code(&snip.code);
        }
    }

    OwnershipLinker::new(ctx, function, uses_argument_list).emit(w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrapgen_core::{
        ArgumentEntry, ArgumentModification, ClassEntry, CodeSnip, CppType, EnumEntry, FunctionModification,
        GeneratorOptions, OperatorKind, PrimitiveKind,
    };
    use wrapgen_registry::ApiRegistry;

    fn registry() -> ApiRegistry {
        let mut registry = ApiRegistry::new();
        registry
            .register_class(
                ClassEntry::object("Overload")
                    .with_enum(EnumEntry::new("ParamEnum", "Overload").with_value("Param0", 0)),
            )
            .unwrap();
        registry
            .register_class(ClassEntry::object("Abstract").with_virtual_destructor())
            .unwrap();
        registry.register_class(ClassEntry::value("Point")).unwrap();
        registry
    }

    fn with_ctx<R>(body: impl FnOnce(&GeneratorContext<'_>) -> R) -> R {
        let registry = registry();
        let options = GeneratorOptions::for_module("sample");
        let ctx = GeneratorContext::new(&registry, &options).unwrap();
        body(&ctx)
    }

    fn int() -> CppType {
        CppType::primitive(PrimitiveKind::Int)
    }

    fn double_plus(removed_default: Option<&str>) -> FunctionEntry {
        let mut second = ArgumentEntry::new("y", int());
        if let Some(value) = removed_default {
            second = second.with_default(value);
        }
        FunctionEntry::method("doublePlus", int())
            .with_arg(ArgumentEntry::new("x", int()))
            .with_arg(second)
            .with_owner("Modifications")
            .with_modification(FunctionModification {
                arguments: vec![ArgumentModification::new(ArgIndex::Arg(2)).removed()],
                ..Default::default()
            })
    }

    #[test]
    fn removed_argument_without_value_fails() {
        with_ctx(|ctx| {
            let err = call_arguments(ctx, &double_plus(None), &[]).unwrap_err();
            assert_eq!(
                err.to_string(),
                "No way to call \"Modifications::doublePlus(int,int)\" with the modifications described in the type system file"
            );
        });
    }

    #[test]
    fn trailing_removed_default_is_omitted_unless_modified() {
        with_ctx(|ctx| {
            assert_eq!(call_arguments(ctx, &double_plus(Some("7")), &[]).unwrap(), vec!["cpp_arg0"]);

            let mut modified = double_plus(Some("7"));
            modified.modification.arguments[0].replaced_default = Some("3".into());
            assert_eq!(call_arguments(ctx, &modified, &[]).unwrap(), vec!["cpp_arg0", "3"]);
        });
    }

    #[test]
    fn enum_defaults_are_scoped() {
        with_ctx(|ctx| {
            let f = FunctionEntry::method("f", CppType::void()).with_arg(
                ArgumentEntry::new("p", CppType::enumeration("Overload::ParamEnum")).with_default("Param0"),
            );
            assert_eq!(scoped_default(ctx, &f, 0).as_deref(), Some("Overload::Param0"));
        });
    }

    #[test]
    fn call_expressions_by_kind() {
        with_ctx(|ctx| {
            let method = FunctionEntry::method("x", int()).with_owner("Point");
            assert_eq!(call_expression(ctx, &method, &[]), "cppSelf->Point::x()");

            let pure = FunctionEntry::method("pureVirtual", CppType::void())
                .as_abstract()
                .with_owner("Abstract");
            assert_eq!(call_expression(ctx, &pure, &[]), "cppSelf->pureVirtual()");

            let add = FunctionEntry::operator(OperatorKind::Add, CppType::value("Point"))
                .with_arg(ArgumentEntry::new("o", CppType::value("Point").const_ref()))
                .with_owner("Point");
            let args = vec!["*cpp_arg0".to_string()];
            assert_eq!(call_expression(ctx, &add, &args), "(*cppSelf) + (*cpp_arg0)");
            assert_eq!(call_expression(ctx, &add.clone().as_reverse(), &args), "(*cpp_arg0) + (*cppSelf)");

            let ctor = FunctionEntry::constructor("Abstract").with_owner("Abstract");
            assert_eq!(call_expression(ctx, &ctor, &[]), "new AbstractWrapper()");

            let global = FunctionEntry::method("gimmeInt", int());
            assert_eq!(call_expression(ctx, &global, &[]), "gimmeInt()");
        });
    }

    #[test]
    fn method_call_converts_result_and_releases_lock() {
        with_ctx(|ctx| {
            let f = FunctionEntry::method("x", int())
                .with_owner("Point")
                .with_modification(FunctionModification {
                    allow_thread: true,
                    snips: vec![CodeSnip::new(SnipPosition::End, CodeLanguage::Dynamic, "// after")],
                    ..Default::default()
                });
            let mut w = CodeWriter::new();
            emit_method_call(ctx, &mut w, &f, &[], false, "0").unwrap();
            let text = w.finish();
            let expected = "\
// x()
thread_state_saver.save();
int cpp_result = cppSelf->Point::x();
thread_state_saver.restore();
py_result = Shiboken::Converter<int >::toPython(cpp_result);

// after
";
            assert_eq!(text, expected);
        });
    }

    #[test]
    fn injected_replacement_skips_the_call() {
        with_ctx(|ctx| {
            let mut f = double_plus(None);
            f.modification
                .snips
                .push(CodeSnip::new(SnipPosition::Replace, CodeLanguage::Dynamic, "py_result = custom();"));
            let mut w = CodeWriter::new();
            emit_method_call(ctx, &mut w, &f, &[], true, "0").unwrap();
            let text = w.finish();
            assert!(text.contains("py_result = custom();"));
            assert!(!text.contains("doublePlus(cpp_arg0"));
        });
    }
}
