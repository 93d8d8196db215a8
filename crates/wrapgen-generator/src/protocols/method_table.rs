//! `PyMethodDef` tables.

use wrapgen_registry::GroupKind;

use crate::GeneratorContext;
use crate::naming;
use crate::overload::OverloadDecisor;
use crate::writer::CodeWriter;

/// Calling convention of a dispatcher; agrees with its parameter list.
pub fn method_flags(decisor: &OverloadDecisor<'_>) -> String {
    let mut flags = if decisor.max_args() == 0 {
        "METH_NOARGS".to_string()
    } else if !decisor.uses_argument_list() {
        "METH_O".to_string()
    } else if decisor.uses_named_arguments() {
        "METH_VARARGS|METH_KEYWORDS".to_string()
    } else {
        "METH_VARARGS".to_string()
    };
    let group = decisor.group();
    if group.scope.is_some() && group.static_members().next().is_some() {
        flags.push_str("|METH_STATIC");
    }
    flags
}

/// Emit `static PyMethodDef <table>[] = { ... };` for the given dispatchers.
///
/// Constructor groups never appear in a method table and are skipped.
pub fn emit_method_table(
    ctx: &GeneratorContext<'_>,
    w: &mut CodeWriter,
    table: &str,
    decisors: &[&OverloadDecisor<'_>],
) {
    emit_method_table_with(ctx, w, table, decisors, &[]);
}

/// Like [`emit_method_table`], with hand-written entries placed before the
/// sentinel.
pub fn emit_method_table_with(
    ctx: &GeneratorContext<'_>,
    w: &mut CodeWriter,
    table: &str,
    decisors: &[&OverloadDecisor<'_>],
    extra: &[String],
) {
    w.block_with(format!("static PyMethodDef {table}[] ="), "};", |w| {
        for decisor in decisors {
            let group = decisor.group();
            if group.kind == GroupKind::Constructor {
                continue;
            }
            w.line(format!(
                "{{\"{}\", (PyCFunction){}, {}}},",
                group.name,
                naming::group_function(group, ctx.module()),
                method_flags(decisor)
            ));
        }
        for entry in extra {
            w.line(entry);
        }
        w.line("{0} // Sentinel");
    });
    w.blank();
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrapgen_core::{ArgumentEntry, ClassEntry, CppType, FunctionEntry, GeneratorOptions, PrimitiveKind};
    use wrapgen_registry::{ApiRegistry, OverloadGroup};

    fn int() -> CppType {
        CppType::primitive(PrimitiveKind::Int)
    }

    fn render(groups: &[OverloadGroup]) -> String {
        let mut registry = ApiRegistry::new();
        registry.register_class(ClassEntry::object("Overload")).unwrap();
        let options = GeneratorOptions::for_module("sample");
        let ctx = GeneratorContext::new(&registry, &options).unwrap();
        let decisors: Vec<OverloadDecisor<'_>> = groups.iter().map(|g| OverloadDecisor::build(&ctx, g)).collect();
        let refs: Vec<&OverloadDecisor<'_>> = decisors.iter().collect();
        let mut w = CodeWriter::new();
        emit_method_table(&ctx, &mut w, "SbkOverload_methods", &refs);
        w.finish()
    }

    fn method(name: &str) -> FunctionEntry {
        FunctionEntry::method(name, CppType::void()).with_owner("Overload")
    }

    #[test]
    fn flags_follow_the_dispatcher_signature() {
        let scope = Some("Overload".to_string());
        let groups = vec![
            OverloadGroup::new("none", scope.clone(), GroupKind::Method).with_function(method("none")),
            OverloadGroup::new("one", scope.clone(), GroupKind::Method)
                .with_function(method("one").with_arg(ArgumentEntry::new("x", int()))),
            OverloadGroup::new("two", scope.clone(), GroupKind::Method).with_function(
                method("two")
                    .with_arg(ArgumentEntry::new("x", int()))
                    .with_arg(ArgumentEntry::new("y", int())),
            ),
            OverloadGroup::new("named", scope.clone(), GroupKind::Method).with_function(
                method("named").with_arg(ArgumentEntry::new("x", int()).with_default("0")),
            ),
            OverloadGroup::new("make", scope, GroupKind::Method)
                .with_function(method("make").as_static()),
        ];
        let expected = "\
static PyMethodDef SbkOverload_methods[] = {
    {\"none\", (PyCFunction)SbkOverloadFunc_none, METH_NOARGS},
    {\"one\", (PyCFunction)SbkOverloadFunc_one, METH_O},
    {\"two\", (PyCFunction)SbkOverloadFunc_two, METH_VARARGS},
    {\"named\", (PyCFunction)SbkOverloadFunc_named, METH_VARARGS|METH_KEYWORDS},
    {\"make\", (PyCFunction)SbkOverloadFunc_make, METH_NOARGS|METH_STATIC},
    {0} // Sentinel
};

";
        assert_eq!(render(&groups), expected);
    }

    #[test]
    fn module_functions_are_never_static() {
        let group = OverloadGroup::new("gimmeInt", None, GroupKind::Global)
            .with_function(FunctionEntry::method("gimmeInt", int()).as_static());
        let text = render(&[group]);
        assert!(text.contains("{\"gimmeInt\", (PyCFunction)SbksampleModule_gimmeInt, METH_NOARGS},"));
    }
}
