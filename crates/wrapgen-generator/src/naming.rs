//! Identifiers of generated symbols and files.
//!
//! Every name the emitters produce comes from here, so a class's type object,
//! its dispatchers and the module init code always agree.

use wrapgen_core::{EnumEntry, FunctionEntry};
use wrapgen_registry::OverloadGroup;

/// Receiver variable inside method dispatchers.
pub const CPP_SELF: &str = "cppSelf";
/// Converted native result.
pub const CPP_RESULT: &str = "cpp_result";
/// Dynamic-side result object.
pub const PY_RESULT: &str = "py_result";
/// Guard releasing the global lock around native calls.
pub const THREAD_STATE_SAVER: &str = "thread_state_saver";

/// Flatten a qualified name into an identifier (`Overload::Inner` -> `Overload_Inner`).
pub fn flat(qualified_name: &str) -> String {
    qualified_name.replace("::", "_")
}

/// Dotted dynamic-side spelling (`Overload::Inner` -> `Overload.Inner`).
pub fn dotted(qualified_name: &str) -> String {
    qualified_name.replace("::", ".")
}

/// `SbkOverload`: prefix of every symbol generated for a class.
pub fn base_name(qualified_name: &str) -> String {
    format!("Sbk{}", flat(qualified_name))
}

/// Type object of a class or enum.
pub fn type_object(qualified_name: &str) -> String {
    format!("{}_Type", base_name(qualified_name))
}

/// Type check macro for a wrapped class.
pub fn check_function(qualified_name: &str) -> String {
    format!("{}_Check", base_name(qualified_name))
}

/// Native trampoline subclass.
pub fn wrapper_class(qualified_name: &str) -> String {
    format!("{}Wrapper", flat(qualified_name))
}

/// Dispatcher for a group; module-level groups are prefixed by the module.
pub fn group_function(group: &OverloadGroup, module: &str) -> String {
    match &group.scope {
        Some(scope) if group.is_constructor() => format!("{}_Init", base_name(scope)),
        Some(scope) => format!("{}Func_{}", base_name(scope), group.name),
        None => format!("Sbk{module}Module_{}", group.name),
    }
}

pub fn methods_table(qualified_name: &str) -> String {
    format!("{}_methods", base_name(qualified_name))
}

pub fn module_methods_table(module: &str) -> String {
    format!("{module}_methods")
}

pub fn getter(qualified_name: &str, field: &str) -> String {
    format!("{}_get_{field}", base_name(qualified_name))
}

pub fn setter(qualified_name: &str, field: &str) -> String {
    format!("{}_set_{field}", base_name(qualified_name))
}

pub fn getset_table(qualified_name: &str) -> String {
    format!("{}_getsetlist", base_name(qualified_name))
}

pub fn richcompare(qualified_name: &str) -> String {
    format!("{}_richcompare", base_name(qualified_name))
}

pub fn number_table(qualified_name: &str) -> String {
    format!("{}_as_number", base_name(qualified_name))
}

pub fn sequence_table(qualified_name: &str) -> String {
    format!("{}_as_sequence", base_name(qualified_name))
}

pub fn mi_init(qualified_name: &str) -> String {
    format!("{}_mi_init", flat(qualified_name))
}

pub fn special_cast(qualified_name: &str) -> String {
    format!("{}SpecialCastFunction", base_name(qualified_name))
}

pub fn type_discovery(qualified_name: &str) -> String {
    format!("{}_typeDiscovery", base_name(qualified_name))
}

/// Per-class registration entry point called from module init.
pub fn class_init(qualified_name: &str) -> String {
    format!("init_{}", flat(qualified_name))
}

pub fn module_init(module: &str) -> String {
    format!("init{module}")
}

pub fn enum_base(entry: &EnumEntry) -> String {
    base_name(&entry.qualified_name)
}

/// Flags type object shares the enum naming scheme.
pub fn flags_base(flags_name: &str) -> String {
    base_name(flags_name)
}

// ==========================================================================
// Files
// ==========================================================================

pub fn class_file(qualified_name: &str) -> String {
    format!("{}_wrapper.cpp", flat(qualified_name).to_lowercase())
}

pub fn module_file(module: &str) -> String {
    format!("{}_module_wrapper.cpp", module.to_lowercase())
}

pub fn module_header(module: &str) -> String {
    format!("{}_python.h", module.to_lowercase())
}

// ==========================================================================
// User-visible names
// ==========================================================================

/// Name used in error messages: `sample.Overload.overloaded`, or
/// `sample.Point` for constructors.
pub fn full_function_name(function: &FunctionEntry, module: &str) -> String {
    let name = if function.is_operator_overload() {
        function
            .operator_kind()
            .and_then(|op| op.dynamic_name(function.operand_count()))
            .map(str::to_string)
            .unwrap_or_else(|| function.dynamic_name())
    } else {
        function.dynamic_name()
    };
    match &function.owner {
        Some(owner) if function.is_constructor() => format!("{module}.{}", dotted(owner)),
        Some(owner) => format!("{module}.{}.{name}", dotted(owner)),
        None => format!("{module}.{name}"),
    }
}

/// `Cls.method`, as shown in virtual-dispatch diagnostics.
pub fn qualified_method(function: &FunctionEntry) -> String {
    match &function.owner {
        Some(owner) => format!("{}.{}", dotted(owner), function.name),
        None => function.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrapgen_core::{ArgumentEntry, CppType, OperatorKind};
    use wrapgen_registry::GroupKind;

    #[test]
    fn class_symbols() {
        assert_eq!(type_object("Overload::Inner"), "SbkOverload_Inner_Type");
        assert_eq!(wrapper_class("Abstract"), "AbstractWrapper");
        assert_eq!(class_init("Point"), "init_Point");
        assert_eq!(mi_init("MDerived"), "MDerived_mi_init");
        assert_eq!(class_file("Overload::Inner"), "overload_inner_wrapper.cpp");
        assert_eq!(module_file("Sample"), "sample_module_wrapper.cpp");
    }

    #[test]
    fn group_functions_depend_on_scope() {
        let method = OverloadGroup::new("overloaded", Some("Overload".into()), GroupKind::Method);
        let ctor = OverloadGroup::new("Point", Some("Point".into()), GroupKind::Constructor);
        let global = OverloadGroup::new("gimmeInt", None, GroupKind::Global);
        assert_eq!(group_function(&method, "sample"), "SbkOverloadFunc_overloaded");
        assert_eq!(group_function(&ctor, "sample"), "SbkPoint_Init");
        assert_eq!(group_function(&global, "sample"), "SbksampleModule_gimmeInt");
    }

    #[test]
    fn error_names_use_dynamic_spellings() {
        let ctor = FunctionEntry::constructor("Point").with_owner("Point");
        assert_eq!(full_function_name(&ctor, "sample"), "sample.Point");
        let add = FunctionEntry::operator(OperatorKind::Add, CppType::value("Point"))
            .with_arg(ArgumentEntry::new("other", CppType::value("Point").const_ref()))
            .as_reverse()
            .with_owner("Point");
        assert_eq!(full_function_name(&add, "sample"), "sample.Point.__add__");
    }
}
