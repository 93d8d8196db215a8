//! Overload groups - candidates sharing one dynamic-visible name.
//!
//! ## Algorithm
//!
//! 1. Drop functions the dynamic side never sees: removed ones, destructors,
//!    assignment and conversion operators, signals, unexposed operators.
//! 2. Key the rest by dynamic name. Reverse operators join the group of their
//!    forward operator (`__radd__` candidates live in `__add__`), since one
//!    decisor serves both directions.
//! 3. Private functions only stay when a public overload shares their name, so
//!    that a call matching the private signature is reported instead of being
//!    silently resolved to another overload.
//! 4. Collapse candidates that differ only in constness, keeping the
//!    non-const one.
//!
//! Groups and their members keep first-declaration order, which makes the
//! decisor built from them a pure function of the model.

use rustc_hash::FxHashMap;

use wrapgen_core::{ClassEntry, FunctionEntry, FunctionKind};

/// Role of a group in the generated wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    Constructor,
    Method,
    /// Arithmetic, bitwise and in-place operators (number protocol).
    NumberOperator,
    /// `==`, `!=`, `<`, ... (rich comparison).
    Comparison,
    /// Free functions of the module.
    Global,
}

/// Candidate native functions sharing one dynamic-visible name in one scope.
#[derive(Debug, Clone, PartialEq)]
pub struct OverloadGroup {
    /// Dynamic-visible name.
    pub name: String,
    /// Owning class, `None` for module-level functions.
    pub scope: Option<String>,
    pub kind: GroupKind,
    /// Candidates in declaration order, without constness repetitions.
    pub functions: Vec<FunctionEntry>,
}

impl OverloadGroup {
    pub fn new(name: impl Into<String>, scope: Option<String>, kind: GroupKind) -> Self {
        Self {
            name: name.into(),
            scope,
            kind,
            functions: Vec::new(),
        }
    }

    pub fn with_function(mut self, function: FunctionEntry) -> Self {
        self.push(function);
        self
    }

    /// Add a candidate, collapsing const/non-const repetitions.
    pub fn push(&mut self, function: FunctionEntry) {
        let key = repetition_key(&function);
        if let Some(existing) = self.functions.iter_mut().find(|f| repetition_key(f) == key) {
            if existing.is_const() && !function.is_const() {
                *existing = function;
            }
            return;
        }
        self.functions.push(function);
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// First candidate; names and error messages are derived from it.
    pub fn reference(&self) -> Option<&FunctionEntry> {
        self.functions.first()
    }

    pub fn is_constructor(&self) -> bool {
        self.kind == GroupKind::Constructor
    }

    /// Every candidate is static.
    pub fn is_static(&self) -> bool {
        !self.functions.is_empty() && self.functions.iter().all(FunctionEntry::is_static)
    }

    pub fn static_members(&self) -> impl Iterator<Item = (usize, &FunctionEntry)> {
        self.functions.iter().enumerate().filter(|(_, f)| f.is_static())
    }

    pub fn instance_members(&self) -> impl Iterator<Item = (usize, &FunctionEntry)> {
        self.functions.iter().enumerate().filter(|(_, f)| !f.is_static())
    }

    pub fn operator_members(&self) -> impl Iterator<Item = (usize, &FunctionEntry)> {
        self.functions
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_operator_overload())
    }

    pub fn has_reverse_operators(&self) -> bool {
        self.functions.iter().any(FunctionEntry::is_reverse_operator)
    }

    pub fn allows_thread(&self) -> bool {
        self.functions.iter().any(FunctionEntry::allows_thread)
    }

    pub fn has_non_void_return(&self) -> bool {
        self.functions.iter().any(|f| !f.returns_void())
    }

    /// Largest number of dynamic-visible arguments.
    pub fn max_args(&self) -> usize {
        self.functions
            .iter()
            .map(|f| f.arguments.len() - f.removed_argument_count())
            .max()
            .unwrap_or(0)
    }

    /// Smallest number of arguments a call must supply.
    pub fn min_args(&self) -> usize {
        self.functions
            .iter()
            .map(|f| {
                f.visible_arguments()
                    .filter(|(i, a)| f.default_value(*i).is_none() && !a.ty.is_varargs())
                    .count()
            })
            .min()
            .unwrap_or(0)
    }

    /// Any candidate has a dynamic-visible defaulted argument.
    pub fn has_argument_with_default(&self) -> bool {
        self.functions
            .iter()
            .any(|f| f.visible_arguments().any(|(i, _)| f.default_value(i).is_some()))
    }

    pub fn has_varargs(&self) -> bool {
        self.functions.iter().any(FunctionEntry::has_varargs)
    }
}

fn repetition_key(function: &FunctionEntry) -> (String, bool, Vec<String>) {
    (
        function.name.clone(),
        function.is_reverse_operator(),
        function.arguments.iter().map(|a| a.ty.cpp_signature()).collect(),
    )
}

fn is_generated(function: &FunctionEntry) -> bool {
    if function.is_removed() {
        return false;
    }
    match function.kind {
        FunctionKind::Destructor | FunctionKind::Conversion | FunctionKind::Signal => false,
        FunctionKind::Operator(op) => op.is_exposed(),
        _ => true,
    }
}

fn group_kind(function: &FunctionEntry) -> GroupKind {
    match function.kind {
        FunctionKind::Constructor | FunctionKind::CopyConstructor => GroupKind::Constructor,
        FunctionKind::Operator(op) if op.is_comparison() => GroupKind::Comparison,
        FunctionKind::Operator(_) => GroupKind::NumberOperator,
        _ => GroupKind::Method,
    }
}

/// Group key: reverse operators share the forward operator's name.
fn group_name(function: &FunctionEntry) -> String {
    match function.kind {
        FunctionKind::Operator(op) if function.modification.rename.is_none() => op
            .dynamic_name(function.operand_count())
            .map(str::to_string)
            .unwrap_or_else(|| function.name.clone()),
        _ => function.dynamic_name(),
    }
}

fn build_groups<'a>(
    functions: impl IntoIterator<Item = &'a FunctionEntry>,
    scope: Option<&str>,
    kind_for: impl Fn(&FunctionEntry) -> GroupKind,
) -> Vec<OverloadGroup> {
    let mut order: Vec<(String, GroupKind)> = Vec::new();
    let mut by_key: FxHashMap<(String, GroupKind), OverloadGroup> = FxHashMap::default();

    for function in functions.into_iter().filter(|f| is_generated(f)) {
        let kind = kind_for(function);
        let key = (group_name(function), kind);
        let group = by_key.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            OverloadGroup::new(key.0.clone(), scope.map(str::to_string), kind)
        });
        group.push(function.clone());
    }

    order
        .into_iter()
        .filter_map(|key| by_key.remove(&key))
        .filter_map(|mut group| {
            if group.functions.iter().all(FunctionEntry::is_private) {
                return None;
            }
            if group.is_constructor() {
                group.functions.retain(|f| !f.is_private());
            }
            Some(group)
        })
        .collect()
}

/// Method, operator and comparison groups of a class (constructors excluded).
pub fn class_function_groups(class: &ClassEntry) -> Vec<OverloadGroup> {
    build_groups(
        class.functions.iter().filter(|f| !f.is_constructor()),
        Some(&class.qualified_name),
        group_kind,
    )
}

/// The constructor group of a class, if it has visible constructors.
pub fn constructor_group(class: &ClassEntry) -> Option<OverloadGroup> {
    build_groups(
        class.functions.iter().filter(|f| f.is_constructor()),
        Some(&class.qualified_name),
        |_| GroupKind::Constructor,
    )
    .into_iter()
    .next()
}

/// Module-level function groups.
pub fn global_function_groups(functions: &[FunctionEntry]) -> Vec<OverloadGroup> {
    build_groups(functions, None, |_| GroupKind::Global)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrapgen_core::{
        ArgumentEntry, CppType, FunctionModification, OperatorKind, PrimitiveKind,
    };

    fn int() -> CppType {
        CppType::primitive(PrimitiveKind::Int)
    }

    #[test]
    fn methods_group_by_name_in_declaration_order() {
        let class = ClassEntry::object("Overload")
            .with_function(FunctionEntry::method("overloaded", int()))
            .with_function(FunctionEntry::method("strBufferOverloads", int()))
            .with_function(
                FunctionEntry::method("overloaded", int())
                    .with_arg(ArgumentEntry::new("size", CppType::value("Size").pointer())),
            );
        let groups = class_function_groups(&class);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "overloaded");
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[1].name, "strBufferOverloads");
    }

    #[test]
    fn const_repetitions_collapse_to_non_const() {
        let class = ClassEntry::object("Str")
            .with_function(FunctionEntry::method("get", int()).as_const())
            .with_function(FunctionEntry::method("get", int()));
        let groups = class_function_groups(&class);
        assert_eq!(groups[0].len(), 1);
        assert!(!groups[0].functions[0].is_const());
    }

    #[test]
    fn reverse_operators_share_the_forward_group() {
        let point = CppType::value("Point");
        let class = ClassEntry::value("Point")
            .with_function(
                FunctionEntry::operator(OperatorKind::Add, point.clone())
                    .with_arg(ArgumentEntry::new("other", point.clone().const_ref())),
            )
            .with_function(
                FunctionEntry::operator(OperatorKind::Add, point.clone())
                    .as_reverse()
                    .with_arg(ArgumentEntry::new("value", int())),
            )
            .with_function(
                FunctionEntry::operator(OperatorKind::Equal, CppType::primitive(PrimitiveKind::Bool))
                    .with_arg(ArgumentEntry::new("other", point.const_ref())),
            );
        let groups = class_function_groups(&class);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "__add__");
        assert_eq!(groups[0].kind, GroupKind::NumberOperator);
        assert!(groups[0].has_reverse_operators());
        assert_eq!(groups[1].kind, GroupKind::Comparison);
    }

    #[test]
    fn removed_and_private_only_groups_are_dropped() {
        let removed = FunctionEntry::method("hidden", int()).with_modification(FunctionModification {
            remove: true,
            ..Default::default()
        });
        let class = ClassEntry::object("C")
            .with_function(removed)
            .with_function(FunctionEntry::method("secret", int()).as_private())
            .with_function(FunctionEntry::method("mixed", int()))
            .with_function(
                FunctionEntry::method("mixed", int())
                    .as_private()
                    .with_arg(ArgumentEntry::new("x", int())),
            );
        let groups = class_function_groups(&class);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "mixed");
        assert_eq!(groups[0].len(), 2);
    }

    #[test]
    fn arity_bounds_account_for_defaults() {
        let group = OverloadGroup::new("f", None, GroupKind::Global)
            .with_function(
                FunctionEntry::method("f", int())
                    .with_arg(ArgumentEntry::new("a", int()))
                    .with_arg(ArgumentEntry::new("b", int()).with_default("2")),
            )
            .with_function(FunctionEntry::method("f", int()).with_arg(ArgumentEntry::new("s", CppType::cstring())));
        assert_eq!(group.min_args(), 1);
        assert_eq!(group.max_args(), 2);
        assert!(group.has_argument_with_default());
    }
}
